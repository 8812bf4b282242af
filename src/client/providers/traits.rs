use crate::client::{Paper, PaperSource};
use async_trait::async_trait;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Upper bound for `max_results`
pub const MAX_RESULTS_LIMIT: u32 = 100;

/// Sort field understood by every source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SortBy {
    #[default]
    #[serde(rename = "relevance")]
    Relevance,
    #[serde(rename = "lastUpdatedDate", alias = "lastUpdated")]
    LastUpdated,
    #[serde(rename = "submittedDate", alias = "submitted")]
    Submitted,
}

impl SortBy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::LastUpdated => "lastUpdatedDate",
            Self::Submitted => "submittedDate",
        }
    }
}

impl FromStr for SortBy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim() {
            "relevance" => Ok(Self::Relevance),
            "lastUpdated" | "lastUpdatedDate" => Ok(Self::LastUpdated),
            "submitted" | "submittedDate" => Ok(Self::Submitted),
            other => Err(crate::Error::invalid_input(
                "sortBy",
                format!("expected relevance, lastUpdatedDate or submittedDate, got '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

impl FromStr for SortOrder {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim() {
            "ascending" | "asc" => Ok(Self::Ascending),
            "descending" | "desc" => Ok(Self::Descending),
            other => Err(crate::Error::invalid_input(
                "sortOrder",
                format!("expected ascending or descending, got '{other}'"),
            )),
        }
    }
}

/// Field the query text is matched against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    #[default]
    All,
    Title,
    Author,
    Abstract,
    Comment,
    Journal,
    Subject,
    Report,
    Id,
}

impl SearchField {
    pub const ALL_FIELDS: [Self; 9] = [
        Self::All,
        Self::Title,
        Self::Author,
        Self::Abstract,
        Self::Comment,
        Self::Journal,
        Self::Subject,
        Self::Report,
        Self::Id,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Title => "title",
            Self::Author => "author",
            Self::Abstract => "abstract",
            Self::Comment => "comment",
            Self::Journal => "journal",
            Self::Subject => "subject",
            Self::Report => "report",
            Self::Id => "id",
        }
    }
}

impl FromStr for SearchField {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL_FIELDS
            .into_iter()
            .find(|field| field.as_str() == wanted)
            .ok_or_else(|| {
                crate::Error::invalid_input("searchField", format!("unknown search field '{s}'"))
            })
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unified search request.
///
/// Date, category and author filters are advisory: the aggregation layer passes
/// them through untouched and each adapter decides how to express them natively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    pub query: String,
    pub start: u32,
    pub max_results: u32,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub search_field: SearchField,
    /// Sources to query; empty means every available source
    pub data_sources: BTreeSet<PaperSource>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub categories: BTreeSet<String>,
    pub author_filter: BTreeSet<String>,
    pub enable_deduplication: bool,
    pub enable_parallel_search: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            start: 0,
            max_results: 10,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            search_field: SearchField::default(),
            data_sources: BTreeSet::new(),
            date_from: None,
            date_to: None,
            categories: BTreeSet::new(),
            author_filter: BTreeSet::new(),
            enable_deduplication: true,
            enable_parallel_search: true,
        }
    }
}

impl SearchRequest {
    /// Create a request with default paging and options
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Restrict the request to the given sources
    #[must_use]
    pub fn with_sources(mut self, sources: impl IntoIterator<Item = PaperSource>) -> Self {
        self.data_sources = sources.into_iter().collect();
        self
    }

    #[must_use]
    pub const fn with_paging(mut self, start: u32, max_results: u32) -> Self {
        self.start = start;
        self.max_results = max_results;
        self
    }

    /// Reject requests that must never be dispatched
    pub fn validate(&self) -> crate::Result<()> {
        if self.query.trim().is_empty() {
            return Err(crate::Error::invalid_input(
                "query",
                "Query cannot be empty",
            ));
        }

        if self.max_results == 0 || self.max_results > MAX_RESULTS_LIMIT {
            return Err(crate::Error::invalid_input(
                "maxResults",
                format!("must be between 1 and {MAX_RESULTS_LIMIT}"),
            ));
        }

        Ok(())
    }

    /// Page size clamped to `[1, MAX_RESULTS_LIMIT]`
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.max_results.clamp(1, MAX_RESULTS_LIMIT)
    }
}

/// A page of papers, either from one source or merged across several
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub papers: Vec<Paper>,
    /// Sum of the totals reported by the contributing sources
    pub total_results: u32,
    pub start_index: u32,
    pub items_per_page: u32,
    pub query: String,
    /// Papers returned per source, before deduplication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_statistics: Option<BTreeMap<String, u32>>,
    #[serde(default)]
    pub searched_sources: BTreeSet<PaperSource>,
    #[serde(default)]
    pub search_time_ms: u64,
    #[serde(default)]
    pub deduplication_applied: bool,
}

impl SearchResponse {
    /// Response with no papers that echoes the request's paging and query
    #[must_use]
    pub fn empty(request: &SearchRequest) -> Self {
        Self::new(Vec::new(), 0, request.start, &request.query)
    }

    /// Response for a single source page; `items_per_page` is the page length
    #[must_use]
    pub fn new(papers: Vec<Paper>, total_results: u32, start_index: u32, query: &str) -> Self {
        let items_per_page = u32::try_from(papers.len()).unwrap_or(u32::MAX);
        Self {
            papers,
            total_results,
            start_index,
            items_per_page,
            query: query.to_string(),
            source_statistics: None,
            searched_sources: BTreeSet::new(),
            search_time_ms: 0,
            deduplication_applied: false,
        }
    }
}

/// Errors that can occur during provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Timeout occurred after {0:?}")]
    Timeout(Duration),

    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Map a reqwest failure without leaking the transport error type
    #[must_use]
    pub fn from_transport(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_connect() {
            Self::Network(format!("Connection failed: {err}"))
        } else if err.is_decode() {
            Self::Parse(format!("Failed to decode response: {err}"))
        } else {
            Self::Network(format!("Request failed: {err}"))
        }
    }

    /// Map a non-success HTTP status
    #[must_use]
    pub fn from_status(status: reqwest::StatusCode, service: &str, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Auth(format!("{service} rejected the credentials ({status})")),
            429 => Self::RateLimit,
            503 => Self::ServiceUnavailable(format!("{service} service temporarily unavailable")),
            _ => Self::Network(format!("HTTP {status}: {body}")),
        }
    }
}

/// Contract every data source adapter implements
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Stable identifier of the source
    fn source_type(&self) -> PaperSource;

    /// Human-readable label
    fn source_name(&self) -> &str;

    /// Lower values win ties during deduplication and sorting
    fn priority(&self) -> u32;

    /// Cheap availability probe.
    ///
    /// Never fails: any error, including the probe's own timeout, reports `false`.
    /// Costs one network round trip.
    async fn is_available(&self) -> bool;

    /// Run the query against the source and normalize every record it returns.
    ///
    /// `total_results`, `start_index` and `items_per_page` describe this source only.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ProviderError>;

    /// Look up one paper by composite or native id
    async fn fetch_by_id(&self, id: &str) -> Result<Option<Paper>, ProviderError>;

    fn build_id(&self, source_id: &str) -> String {
        self.source_type().build_id(source_id)
    }

    /// Strip this adapter's composite id prefix, if present
    fn strip_id_prefix<'a>(&self, id: &'a str) -> &'a str {
        let prefix = self.source_type().id_prefix();
        id.strip_prefix(prefix.as_str()).unwrap_or(id)
    }
}
