use super::traits::{
    ProviderError, SearchField, SearchRequest, SearchResponse, SortBy, SortOrder, SourceProvider,
};
use super::{body_preview, clean_text};
use crate::client::{HttpClientConfig, Paper, PaperSource};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://ieeexploreapi.ieee.org/api/v1/search/articles";
pub const DEFAULT_PRIORITY: u32 = 2;

/// IEEE Xplore search response
#[derive(Debug, Deserialize)]
struct IeeeResponse {
    #[serde(default)]
    total_records: u32,
    #[serde(default)]
    articles: Vec<IeeeArticle>,
}

/// Individual article from the IEEE Xplore API
#[derive(Debug, Deserialize)]
struct IeeeArticle {
    #[serde(deserialize_with = "string_or_number")]
    article_number: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
    #[serde(default)]
    authors: Option<IeeeAuthors>,
    #[serde(default)]
    publication_date: Option<String>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    publication_year: Option<String>,
    #[serde(default)]
    insert_date: Option<String>,
    #[serde(default)]
    index_terms: Option<IeeeIndexTerms>,
    #[serde(default)]
    pdf_url: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    abstract_url: Option<String>,
    #[serde(default)]
    doi: Option<String>,
    #[serde(default)]
    publication_title: Option<String>,
    #[serde(default)]
    citing_paper_count: Option<u32>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    publisher: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IeeeAuthors {
    #[serde(default)]
    authors: Vec<IeeeAuthor>,
}

#[derive(Debug, Deserialize)]
struct IeeeAuthor {
    #[serde(default)]
    full_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IeeeIndexTerms {
    #[serde(default)]
    ieee_terms: Option<IeeeTerms>,
    #[serde(default)]
    author_terms: Option<IeeeTerms>,
    #[serde(default, rename = "dynamic_index_terms")]
    dynamic_terms: Option<IeeeTerms>,
}

#[derive(Debug, Default, Deserialize)]
struct IeeeTerms {
    #[serde(default)]
    terms: Vec<String>,
}

/// IEEE Xplore metadata API provider.
///
/// The API requires a key; without one the provider reports itself unavailable and
/// refuses to search.
pub struct IeeeProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    priority: u32,
    request_timeout: Duration,
    probe_timeout: Duration,
}

impl IeeeProvider {
    pub fn new(http: &HttpClientConfig, api_key: Option<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http.build_client()?,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            priority: DEFAULT_PRIORITY,
            request_timeout: http.timeout,
            probe_timeout: Duration::from_secs(5),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub const fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Auth("IEEE Xplore API key not configured".to_string()))
    }

    fn endpoint(&self, api_key: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ProviderError::Other(format!("Invalid base URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("apikey", api_key)
            .append_pair("format", "json");
        Ok(url)
    }

    /// Query parameter the search text is sent in
    const fn field_parameter(field: SearchField) -> &'static str {
        match field {
            SearchField::All | SearchField::Comment | SearchField::Report => "querytext",
            SearchField::Title => "article_title",
            SearchField::Author => "author",
            SearchField::Abstract => "abstract",
            SearchField::Journal => "publication_title",
            SearchField::Subject => "index_terms",
            SearchField::Id => "article_number",
        }
    }

    fn build_search_url(&self, request: &SearchRequest) -> Result<String, ProviderError> {
        let mut url = self.endpoint(self.api_key()?)?;

        {
            let field = Self::field_parameter(request.search_field);
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair(field, request.query.trim())
                .append_pair("start_record", &(u64::from(request.start) + 1).to_string())
                .append_pair("max_records", &request.max_results.to_string());

            if request.sort_by != SortBy::Relevance {
                pairs.append_pair("sort_field", "publication_year").append_pair(
                    "sort_order",
                    match request.sort_order {
                        SortOrder::Ascending => "asc",
                        SortOrder::Descending => "desc",
                    },
                );
            }

            if let Some(from) = request.date_from {
                pairs.append_pair("start_year", &from.format("%Y").to_string());
            }
            if let Some(to) = request.date_to {
                pairs.append_pair("end_year", &to.format("%Y").to_string());
            }
        }

        Ok(url.to_string())
    }

    fn build_lookup_url(&self, native_id: &str) -> Result<String, ProviderError> {
        let mut url = self.endpoint(self.api_key()?)?;
        url.query_pairs_mut()
            .append_pair("article_number", native_id)
            .append_pair("max_records", "1");
        Ok(url.to_string())
    }

    fn build_probe_url(&self) -> Result<String, ProviderError> {
        let mut url = self.endpoint(self.api_key()?)?;
        url.query_pairs_mut()
            .append_pair("querytext", "quantum")
            .append_pair("max_records", "1");
        Ok(url.to_string())
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Result<IeeeResponse, ProviderError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(
                status,
                "IEEE Xplore",
                &body_preview(&error_text),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to read response: {e}")))?;

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::Parse(format!("Failed to parse IEEE Xplore JSON: {e}")))
    }

    fn convert_article(article: IeeeArticle) -> Paper {
        let title = article.title.as_deref().map(clean_text);
        let mut paper = Paper::new(
            PaperSource::Ieee,
            article.article_number,
            title.unwrap_or_default(),
        );

        let summary = article.abstract_text.as_deref().map(clean_text);
        paper.summary = summary.unwrap_or_default();
        paper.authors = article
            .authors
            .map(|a| a.authors)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| a.full_name.map(|name| clean_text(&name)))
            .filter(|name| !name.is_empty())
            .collect();
        paper.published_date = parse_publication_date(
            article.publication_date.as_deref(),
            article.publication_year.as_deref(),
        );
        paper.updated_date = article.insert_date.as_deref().and_then(parse_insert_date);

        let terms = article.index_terms.unwrap_or_default();
        for term in terms.ieee_terms.unwrap_or_default().terms {
            paper.add_category(term);
        }
        paper.keywords = terms.author_terms.unwrap_or_default().terms;
        for term in terms.dynamic_terms.unwrap_or_default().terms {
            if !paper.keywords.contains(&term) {
                paper.keywords.push(term);
            }
        }
        paper.primary_category = paper.categories.first().cloned();

        paper.pdf_url = article.pdf_url;
        paper.paper_url = article.html_url.or(article.abstract_url);
        paper.doi = article.doi;
        paper.venue = article.publication_title.map(|v| clean_text(&v));
        paper.citation_count = article.citing_paper_count;

        if let Some(content_type) = article.content_type {
            paper
                .extra_properties
                .insert("contentType".to_string(), content_type.into());
        }
        if let Some(publisher) = article.publisher {
            paper
                .extra_properties
                .insert("publisher".to_string(), publisher.into());
        }

        paper
    }
}

#[async_trait]
impl SourceProvider for IeeeProvider {
    fn source_type(&self) -> PaperSource {
        PaperSource::Ieee
    }

    fn source_name(&self) -> &str {
        "IEEE Xplore"
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn is_available(&self) -> bool {
        let url = match self.build_probe_url() {
            Ok(url) => url,
            Err(e) => {
                debug!("IEEE Xplore marked unavailable: {}", e);
                return false;
            }
        };

        match self.fetch(&url, self.probe_timeout).await {
            Ok(_) => true,
            Err(e) => {
                warn!("IEEE Xplore health check failed: {}", e);
                false
            }
        }
    }

    #[instrument(skip(self, request), fields(source = "ieee", query = %request.query))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ProviderError> {
        let start_time = Instant::now();
        info!(
            "Searching IEEE Xplore for: {} (field: {})",
            request.query, request.search_field
        );

        let url = self.build_search_url(request)?;
        let result = self.fetch(&url, self.request_timeout).await?;

        let papers: Vec<Paper> = result
            .articles
            .into_iter()
            .map(Self::convert_article)
            .collect();

        info!(
            "IEEE Xplore search completed: {} papers of {} in {:?}",
            papers.len(),
            result.total_records,
            start_time.elapsed()
        );

        Ok(SearchResponse::new(
            papers,
            result.total_records,
            request.start,
            &request.query,
        ))
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Paper>, ProviderError> {
        let native_id = self.strip_id_prefix(id.trim());
        if native_id.is_empty() {
            return Ok(None);
        }

        info!("Fetching IEEE Xplore article {}", native_id);
        let url = self.build_lookup_url(native_id)?;
        let result = self.fetch(&url, self.request_timeout).await?;

        Ok(result
            .articles
            .into_iter()
            .next()
            .map(Self::convert_article))
    }
}

/// IEEE dates come as `12 March 2023`, `12-15 March 2023`, `March 2023` or only `2023`
fn parse_publication_date(date: Option<&str>, year: Option<&str>) -> Option<DateTime<Utc>> {
    let parsed = date.and_then(|raw| {
        let cleaned = clean_text(raw);
        let cleaned = match cleaned.split_once(' ') {
            // "12-15 March 2023" -> "12 March 2023"
            Some((days, rest)) if days.contains('-') => {
                format!("{} {rest}", days.split('-').next().unwrap_or(days))
            }
            _ => cleaned,
        };

        ["%d %B %Y", "%d %b %Y", "%d %b. %Y"]
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(&cleaned, format).ok())
            .or_else(|| NaiveDate::parse_from_str(&format!("1 {cleaned}"), "%d %B %Y").ok())
    });

    parsed
        .or_else(|| {
            year.and_then(|y| y.trim().parse::<i32>().ok())
                .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
        })
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// `20230315`
fn parse_insert_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(raw.trim(), "%Y%m%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const SAMPLE_RESPONSE: &str = r#"{
        "total_records": 2381,
        "total_searched": 5923130,
        "articles": [
            {
                "article_number": "9540187",
                "title": "Deep  Residual Learning\nfor Image Recognition",
                "abstract": "Deeper neural networks are more difficult to train.",
                "authors": {"authors": [
                    {"full_name": "Kaiming He", "author_order": 1},
                    {"full_name": "Xiangyu Zhang", "author_order": 2}
                ]},
                "publication_date": "27-30 June 2016",
                "publication_year": 2016,
                "insert_date": "20161212",
                "index_terms": {
                    "ieee_terms": {"terms": ["Training", "Neural networks"]},
                    "author_terms": {"terms": ["residual learning"]}
                },
                "pdf_url": "https://ieeexplore.ieee.org/stamp/stamp.jsp?arnumber=9540187",
                "html_url": "https://ieeexplore.ieee.org/document/9540187/",
                "doi": "10.1109/CVPR.2016.90",
                "publication_title": "2016 IEEE Conference on Computer Vision and Pattern Recognition (CVPR)",
                "citing_paper_count": 120000,
                "content_type": "Conferences"
            },
            {
                "article_number": 1234567,
                "publication_date": "Spring 2019"
            }
        ]
    }"#;

    fn provider(api_key: Option<&str>) -> IeeeProvider {
        IeeeProvider::new(&HttpClientConfig::default(), api_key.map(str::to_string)).unwrap()
    }

    #[test]
    fn test_search_url_requires_key() {
        let request = SearchRequest::new("resnet");
        assert!(matches!(
            provider(None).build_search_url(&request),
            Err(ProviderError::Auth(_))
        ));
        assert!(matches!(
            provider(Some("  ")).build_search_url(&request),
            Err(ProviderError::Auth(_))
        ));
    }

    #[test]
    fn test_search_url_building() {
        let mut request = SearchRequest::new("residual networks").with_paging(10, 25);
        request.search_field = SearchField::Title;
        request.sort_by = SortBy::Submitted;
        request.sort_order = SortOrder::Ascending;
        request.date_from = NaiveDate::from_ymd_opt(2015, 6, 1);

        let url = provider(Some("secret")).build_search_url(&request).unwrap();
        assert!(url.contains("apikey=secret"));
        assert!(url.contains("format=json"));
        assert!(url.contains("article_title=residual+networks"));
        assert!(url.contains("start_record=11"));
        assert!(url.contains("max_records=25"));
        assert!(url.contains("sort_field=publication_year"));
        assert!(url.contains("sort_order=asc"));
        assert!(url.contains("start_year=2015"));
        assert!(!url.contains("end_year"));
    }

    #[test]
    fn test_convert_articles() {
        let response: IeeeResponse = serde_json::from_str(SAMPLE_RESPONSE).unwrap();
        assert_eq!(response.total_records, 2381);

        let papers: Vec<Paper> = response
            .articles
            .into_iter()
            .map(IeeeProvider::convert_article)
            .collect();

        let paper = &papers[0];
        assert_eq!(paper.id, "ieee_9540187");
        assert_eq!(paper.title, "Deep Residual Learning for Image Recognition");
        assert_eq!(paper.authors, vec!["Kaiming He", "Xiangyu Zhang"]);
        assert_eq!(paper.categories, vec!["Training", "Neural networks"]);
        assert_eq!(paper.primary_category.as_deref(), Some("Training"));
        assert_eq!(paper.keywords, vec!["residual learning"]);
        assert_eq!(paper.doi.as_deref(), Some("10.1109/CVPR.2016.90"));
        assert_eq!(paper.citation_count, Some(120_000));
        let published = paper.published_date.unwrap();
        let conference_start = NaiveDate::from_ymd_opt(2016, 6, 27).unwrap();
        assert_eq!(published.date_naive(), conference_start);
        assert_eq!(paper.updated_date.unwrap().year(), 2016);
        assert_eq!(paper.extra_properties["contentType"], "Conferences");

        let sparse = &papers[1];
        assert_eq!(sparse.source_id, "1234567");
        assert!(sparse.title.is_empty());
        assert!(sparse.authors.is_empty());
        assert!(sparse.categories.is_empty());
        assert!(sparse.primary_category.is_none());
        assert!(sparse.published_date.is_none());
    }

    #[test]
    fn test_parse_publication_date_formats() {
        let ymd = |date: Option<&str>, year: Option<&str>| {
            parse_publication_date(date, year).map(|d| (d.year(), d.month(), d.day()))
        };
        assert_eq!(ymd(Some("12 March 2023"), None), Some((2023, 3, 12)));
        assert_eq!(ymd(Some("March 2023"), None), Some((2023, 3, 1)));
        assert_eq!(ymd(Some("unknown"), Some("2021")), Some((2021, 1, 1)));
        assert_eq!(ymd(Some("unknown"), None), None);
        assert_eq!(ymd(None, None), None);
    }
}
