use super::traits::{ProviderError, SearchField, SearchRequest, SearchResponse, SourceProvider};
use super::{body_preview, clean_text};
use crate::client::{HttpClientConfig, Paper, PaperSource};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://export.arxiv.org/api/query";
pub const DEFAULT_PRIORITY: u32 = 1;

/// Parsed Atom feed: opensearch paging metadata plus normalized entries
#[derive(Debug, Default)]
struct ArxivFeed {
    total_results: Option<u32>,
    start_index: Option<u32>,
    items_per_page: Option<u32>,
    papers: Vec<Paper>,
}

#[derive(Debug, Serialize)]
struct ArxivLink {
    href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rel: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    link_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
}

/// arXiv API provider for academic papers
pub struct ArxivProvider {
    client: Client,
    base_url: String,
    priority: u32,
    request_timeout: Duration,
    probe_timeout: Duration,
}

impl ArxivProvider {
    /// Create a new arXiv provider against the public export API
    pub fn new(http: &HttpClientConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http.build_client()?,
            base_url: DEFAULT_BASE_URL.to_string(),
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

    /// Translate the generic request into an arXiv `search_query` expression
    fn build_search_query(request: &SearchRequest) -> String {
        let query = request.query.trim();
        let base = match request.search_field {
            SearchField::All => query.to_string(),
            SearchField::Title => format!("ti:{query}"),
            SearchField::Author => format!("au:{query}"),
            SearchField::Abstract => format!("abs:{query}"),
            SearchField::Comment => format!("co:{query}"),
            SearchField::Journal => format!("jr:{query}"),
            SearchField::Subject => format!("cat:{query}"),
            SearchField::Report => format!("rn:{query}"),
            SearchField::Id => format!("id:{query}"),
        };

        let mut clauses = vec![base];

        if request.date_from.is_some() || request.date_to.is_some() {
            clauses.push(format!(
                "submittedDate:[{} TO {}]",
                format_bound(request.date_from, "000000000000", "0000"),
                format_bound(request.date_to, "999912312359", "2359"),
            ));
        }

        if let Some(clause) = any_of("cat", &request.categories, false) {
            clauses.push(clause);
        }

        if let Some(clause) = any_of("au", &request.author_filter, true) {
            clauses.push(clause);
        }

        clauses.join(" AND ")
    }

    /// Build arXiv API URL for search
    fn build_search_url(&self, request: &SearchRequest) -> Result<String, ProviderError> {
        let mut url = self.base_url()?;

        url.query_pairs_mut()
            .append_pair("search_query", &Self::build_search_query(request))
            .append_pair("start", &request.start.to_string())
            .append_pair("max_results", &request.max_results.to_string())
            .append_pair("sortBy", request.sort_by.as_str())
            .append_pair("sortOrder", request.sort_order.as_str());

        Ok(url.to_string())
    }

    fn build_id_lookup_url(&self, native_id: &str) -> Result<String, ProviderError> {
        let mut url = self.base_url()?;
        url.query_pairs_mut()
            .append_pair("id_list", native_id)
            .append_pair("max_results", "1");
        Ok(url.to_string())
    }

    fn build_probe_url(&self) -> Result<String, ProviderError> {
        let mut url = self.base_url()?;
        url.query_pairs_mut()
            .append_pair("search_query", "quantum")
            .append_pair("max_results", "1");
        Ok(url.to_string())
    }

    fn base_url(&self) -> Result<Url, ProviderError> {
        Url::parse(&self.base_url)
            .map_err(|e| ProviderError::Other(format!("Invalid base URL: {e}")))
    }

    /// GET a URL and return the body of a successful response
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, ProviderError> {
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
                "arXiv",
                &body_preview(&error_text),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to read response: {e}")))
    }

    /// Parse arXiv Atom feed response
    fn parse_feed(response_text: &str) -> Result<ArxivFeed, ProviderError> {
        use roxmltree::Document;

        let doc = Document::parse(response_text)
            .map_err(|e| ProviderError::Parse(format!("Failed to parse XML: {e}")))?;

        let root = doc.root_element();
        let mut feed = ArxivFeed::default();

        for child in root.children().filter(roxmltree::Node::is_element) {
            match child.tag_name().name() {
                "totalResults" => feed.total_results = parse_count(child.text()),
                "startIndex" => feed.start_index = parse_count(child.text()),
                "itemsPerPage" => feed.items_per_page = parse_count(child.text()),
                "entry" => {
                    if let Some(paper) = Self::parse_entry(child)? {
                        feed.papers.push(paper);
                    }
                }
                _ => {}
            }
        }

        debug!("Parsed {} papers from arXiv response", feed.papers.len());
        Ok(feed)
    }

    fn parse_entry(entry: roxmltree::Node<'_, '_>) -> Result<Option<Paper>, ProviderError> {
        let Some(raw_id) = child_text(entry, "id") else {
            debug!("Skipping arXiv entry without an id");
            return Ok(None);
        };

        if raw_id.contains("/api/errors") {
            let message = child_text(entry, "summary").map_or(raw_id, |s| clean_text(&s));
            return Err(ProviderError::InvalidQuery(message));
        }

        let source_id = extract_arxiv_id(&raw_id);
        let title = child_text(entry, "title").unwrap_or_default();
        let mut paper = Paper::new(PaperSource::Arxiv, source_id, clean_text(&title));
        paper.summary = clean_text(&child_text(entry, "summary").unwrap_or_default());
        paper.published_date = child_text(entry, "published").and_then(|d| parse_date(&d));
        paper.updated_date = child_text(entry, "updated").and_then(|d| parse_date(&d));

        let mut links = Vec::new();
        for child in entry.children().filter(roxmltree::Node::is_element) {
            match child.tag_name().name() {
                "author" => {
                    for name_elem in child.children().filter(|n| n.has_tag_name("name")) {
                        if let Some(author_name) = name_elem.text().map(clean_text) {
                            if !author_name.is_empty() {
                                paper.authors.push(author_name);
                            }
                        }
                    }
                }
                "category" => {
                    if let Some(term) = child.attribute("term") {
                        paper.add_category(term);
                    }
                }
                "primary_category" => {
                    paper.primary_category = child.attribute("term").map(str::to_string);
                }
                "link" => {
                    if let Some(href) = child.attribute("href") {
                        links.push(ArxivLink {
                            href: href.to_string(),
                            rel: child.attribute("rel").map(str::to_string),
                            link_type: child.attribute("type").map(str::to_string),
                            title: child.attribute("title").map(str::to_string),
                        });
                    }
                }
                "doi" => paper.doi = child.text().map(clean_text),
                "journal_ref" => paper.venue = child.text().map(clean_text),
                "comment" => {
                    if let Some(comment) = child.text().map(clean_text) {
                        paper
                            .extra_properties
                            .insert("comment".to_string(), comment.into());
                    }
                }
                _ => {}
            }
        }

        paper.pdf_url = links
            .iter()
            .find(|l| l.rel.as_deref() == Some("related") && l.title.as_deref() == Some("pdf"))
            .map(|l| l.href.clone());
        paper.paper_url = links
            .iter()
            .find(|l| l.rel.as_deref() == Some("alternate"))
            .map(|l| l.href.clone());

        if !links.is_empty() {
            let links = serde_json::to_value(&links)
                .map_err(|e| ProviderError::Parse(format!("Failed to encode links: {e}")))?;
            paper.extra_properties.insert("links".to_string(), links);
        }

        Ok(Some(paper))
    }
}

#[async_trait]
impl SourceProvider for ArxivProvider {
    fn source_type(&self) -> PaperSource {
        PaperSource::Arxiv
    }

    fn source_name(&self) -> &str {
        "arXiv"
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn is_available(&self) -> bool {
        debug!("Performing arXiv health check");

        let url = match self.build_probe_url() {
            Ok(url) => url,
            Err(e) => {
                warn!("arXiv health check failed: {}", e);
                return false;
            }
        };

        match self.fetch(&url, self.probe_timeout).await {
            Ok(body) => {
                let healthy = body.contains("<feed");
                debug!(healthy, "arXiv health check finished");
                healthy
            }
            Err(e) => {
                warn!("arXiv health check failed: {}", e);
                false
            }
        }
    }

    #[instrument(skip(self, request), fields(source = "arxiv", query = %request.query))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ProviderError> {
        let start_time = Instant::now();

        info!(
            "Searching arXiv for: {} (field: {})",
            request.query, request.search_field
        );

        let url = self.build_search_url(request)?;
        debug!("arXiv search URL: {}", url);

        let response_text = self.fetch(&url, self.request_timeout).await?;
        if response_text.trim().is_empty() {
            warn!("arXiv returned an empty body");
            return Ok(SearchResponse::empty(request));
        }

        let feed = Self::parse_feed(&response_text)?;
        let returned = u32::try_from(feed.papers.len()).unwrap_or(u32::MAX);

        let mut response = SearchResponse::new(
            feed.papers,
            feed.total_results.unwrap_or(returned),
            feed.start_index.unwrap_or(request.start),
            &request.query,
        );
        if let Some(items_per_page) = feed.items_per_page {
            response.items_per_page = items_per_page;
        }

        info!(
            "arXiv search completed: {} papers of {} in {:?}",
            returned,
            response.total_results,
            start_time.elapsed()
        );

        Ok(response)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Paper>, ProviderError> {
        let native_id = self.strip_id_prefix(id.trim());
        if native_id.is_empty() {
            return Ok(None);
        }

        info!("Fetching arXiv paper {}", native_id);
        let url = self.build_id_lookup_url(native_id)?;
        let response_text = self.fetch(&url, self.request_timeout).await?;
        if response_text.trim().is_empty() {
            return Ok(None);
        }

        match Self::parse_feed(&response_text) {
            Ok(feed) => Ok(feed.papers.into_iter().next()),
            Err(ProviderError::InvalidQuery(reason)) => {
                debug!("arXiv rejected id {}: {}", native_id, reason);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn child_text(node: roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn parse_count(text: Option<&str>) -> Option<u32> {
    text.and_then(|t| t.trim().parse().ok())
}

/// `http://arxiv.org/abs/2301.01234v1` -> `2301.01234v1`,
/// `http://arxiv.org/abs/hep-th/9901001v1` -> `hep-th/9901001v1`
fn extract_arxiv_id(full_id: &str) -> String {
    full_id.split_once("/abs/").map_or_else(
        || full_id.rsplit('/').next().unwrap_or(full_id).to_string(),
        |(_, id)| id.to_string(),
    )
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn format_bound(date: Option<NaiveDate>, open: &str, time: &str) -> String {
    date.map_or_else(
        || open.to_string(),
        |d| format!("{}{time}", d.format("%Y%m%d")),
    )
}

fn any_of(prefix: &str, values: &BTreeSet<String>, quote: bool) -> Option<String> {
    let terms: Vec<String> = values
        .iter()
        .map(String::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            if quote {
                format!("{prefix}:\"{v}\"")
            } else {
                format!("{prefix}:{v}")
            }
        })
        .collect();

    match terms.len() {
        0 => None,
        1 => terms.into_iter().next(),
        _ => Some(format!("({})", terms.join(" OR "))),
    }
}
