use chrono::NaiveDate;
use papertrail_search::client::HttpClientConfig;
use papertrail_search::{
    IeeeProvider, PaperSource, ProviderError, SearchField, SearchRequest, SourceProvider,
};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";

const ARTICLES: &str = r#"{
    "total_records": 57,
    "total_searched": 6000000,
    "articles": [
        {
            "article_number": "7780459",
            "title": "Deep Residual Learning for Image Recognition",
            "abstract": "Residual networks.",
            "authors": {"authors": [{"full_name": "Kaiming He"}, {"full_name": "Jian Sun"}]},
            "publication_date": "27-30 June 2016",
            "publication_year": "2016",
            "index_terms": {"ieee_terms": {"terms": ["Training", "Image recognition"]}},
            "html_url": "https://ieeexplore.ieee.org/document/7780459/",
            "doi": "10.1109/CVPR.2016.90",
            "publication_title": "2016 IEEE Conference on Computer Vision and Pattern Recognition (CVPR)",
            "citing_paper_count": 100000
        }
    ]
}"#;

fn provider(server: &MockServer, api_key: Option<&str>) -> IeeeProvider {
    IeeeProvider::new(&HttpClientConfig::default(), api_key.map(str::to_string))
        .unwrap()
        .with_base_url(format!("{}/api/v1/search/articles", server.uri()))
        .with_probe_timeout(Duration::from_secs(2))
}

fn json_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "application/json")
        .set_body_string(body)
}

#[tokio::test]
async fn test_missing_key_never_calls_the_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(json_response(ARTICLES))
        .expect(0)
        .mount(&server)
        .await;

    let provider = provider(&server, None);
    assert!(!provider.is_available().await);
    assert!(matches!(
        provider.search(&SearchRequest::new("resnet")).await,
        Err(ProviderError::Auth(_))
    ));
}

#[tokio::test]
async fn test_search_translates_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search/articles"))
        .and(query_param("apikey", API_KEY))
        .and(query_param("format", "json"))
        .and(query_param("author", "Kaiming He"))
        .and(query_param("start_record", "21"))
        .and(query_param("max_records", "10"))
        .and(query_param("start_year", "2015"))
        .and(query_param("end_year", "2017"))
        .respond_with(json_response(ARTICLES))
        .expect(1)
        .mount(&server)
        .await;

    let mut request = SearchRequest::new("Kaiming He").with_paging(20, 10);
    request.search_field = SearchField::Author;
    request.date_from = NaiveDate::from_ymd_opt(2015, 1, 1);
    request.date_to = NaiveDate::from_ymd_opt(2017, 12, 31);

    let ieee = provider(&server, Some(API_KEY));
    let response = ieee.search(&request).await.unwrap();
    assert_eq!(response.total_results, 57);
    assert_eq!(response.start_index, 20);
    assert_eq!(response.papers.len(), 1);

    let paper = &response.papers[0];
    assert_eq!(paper.id, "ieee_7780459");
    assert_eq!(paper.source, PaperSource::Ieee);
    assert_eq!(paper.authors, vec!["Kaiming He", "Jian Sun"]);
    assert_eq!(paper.categories, vec!["Training", "Image recognition"]);
    assert_eq!(paper.citation_count, Some(100_000));
    assert_eq!(
        paper.paper_url.as_deref(),
        Some("https://ieeexplore.ieee.org/document/7780459/")
    );
    assert!(paper.published_date.is_some());
}

#[tokio::test]
async fn test_rejected_key_and_bad_json() {
    let server = MockServer::start().await;
    let inactive = ResponseTemplate::new(403).set_body_string("Developer Inactive");
    Mock::given(method("GET"))
        .and(query_param("apikey", "revoked"))
        .respond_with(inactive)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("apikey", API_KEY))
        .respond_with(json_response("{not json"))
        .mount(&server)
        .await;

    let request = SearchRequest::new("q");
    assert!(matches!(
        provider(&server, Some("revoked")).search(&request).await,
        Err(ProviderError::Auth(_))
    ));
    assert!(matches!(
        provider(&server, Some(API_KEY)).search(&request).await,
        Err(ProviderError::Parse(_))
    ));
}

#[tokio::test]
async fn test_probe_and_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("querytext", "quantum"))
        .and(query_param("max_records", "1"))
        .respond_with(json_response(ARTICLES))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("article_number", "7780459"))
        .respond_with(json_response(ARTICLES))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("article_number", "1"))
        .respond_with(json_response(r#"{"total_records": 0}"#))
        .mount(&server)
        .await;

    let provider = provider(&server, Some(API_KEY));
    assert!(provider.is_available().await);

    let paper = provider.fetch_by_id("ieee_7780459").await.unwrap().unwrap();
    assert_eq!(paper.doi.as_deref(), Some("10.1109/CVPR.2016.90"));
    assert!(provider.fetch_by_id("ieee_1").await.unwrap().is_none());
}
