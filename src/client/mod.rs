pub mod merge;
pub mod meta_search;
pub mod providers;
pub mod registry;

pub use merge::MergePipeline;
pub use meta_search::{MetaSearchClient, MetaSearchConfig};
pub use registry::ProviderRegistry;

use crate::client::providers::ProviderError;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// HTTP client configuration shared by the source adapters
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout duration
    pub timeout: Duration,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Proxy URL (optional)
    pub proxy: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("papertrail-search/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
        }
    }
}

impl HttpClientConfig {
    /// Build a reqwest client honouring this configuration.
    ///
    /// Every request made through the client is bounded by `timeout`, so tasks the
    /// aggregation engine abandons still terminate on their own.
    pub fn build_client(&self) -> Result<reqwest::Client, ProviderError> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(&self.user_agent);

        if let Some(proxy) = self.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| ProviderError::Other(format!("Invalid proxy URL: {e}")))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| ProviderError::Other(format!("Failed to create HTTP client: {e}")))
    }
}

/// Closed set of data sources a paper can originate from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaperSource {
    Arxiv,
    Ieee,
    Acm,
    Dblp,
    Pubmed,
    Springer,
    Elsevier,
}

impl PaperSource {
    pub const ALL: [Self; 7] = [
        Self::Arxiv,
        Self::Ieee,
        Self::Acm,
        Self::Dblp,
        Self::Pubmed,
        Self::Springer,
        Self::Elsevier,
    ];

    /// Uppercase tag, as serialized
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Arxiv => "ARXIV",
            Self::Ieee => "IEEE",
            Self::Acm => "ACM",
            Self::Dblp => "DBLP",
            Self::Pubmed => "PUBMED",
            Self::Springer => "SPRINGER",
            Self::Elsevier => "ELSEVIER",
        }
    }

    /// Human-readable name
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Arxiv => "arXiv",
            Self::Ieee => "IEEE Xplore",
            Self::Acm => "ACM Digital Library",
            Self::Dblp => "DBLP",
            Self::Pubmed => "PubMed",
            Self::Springer => "Springer",
            Self::Elsevier => "Elsevier",
        }
    }

    /// Prefix used in composite ids, e.g. `arxiv_`
    #[must_use]
    pub fn id_prefix(self) -> String {
        format!("{}_", self.tag().to_lowercase())
    }

    /// Build the composite id `<lowercase tag>_<source id>`
    #[must_use]
    pub fn build_id(self, source_id: &str) -> String {
        format!("{}{}", self.id_prefix(), source_id)
    }

    /// Recover the source from a composite id.
    ///
    /// Returns `None` when the id has no `_` or the prefix is not a known tag.
    #[must_use]
    pub fn parse_from_id(id: &str) -> Option<Self> {
        let (prefix, _) = id.split_once('_')?;
        prefix.parse().ok()
    }
}

impl fmt::Display for PaperSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for PaperSource {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let upper = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|source| source.tag() == upper)
            .ok_or_else(|| {
                crate::Error::invalid_input("source", format!("unknown data source '{s}'"))
            })
    }
}

/// Canonical paper record every adapter normalizes into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    /// Composite id, see [`PaperSource::build_id`]
    pub id: String,
    pub source: PaperSource,
    /// Identifier native to the source
    pub source_id: String,
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
    pub primary_category: Option<String>,
    pub pdf_url: Option<String>,
    pub paper_url: Option<String>,
    pub doi: Option<String>,
    /// Journal or conference name
    pub venue: Option<String>,
    pub citation_count: Option<u32>,
    pub keywords: Vec<String>,
    /// Source-specific metadata
    pub extra_properties: HashMap<String, serde_json::Value>,
}

impl Paper {
    /// Create a paper with only its identity and title filled in
    #[must_use]
    pub fn new(
        source: PaperSource,
        source_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let source_id = source_id.into();
        Self {
            id: source.build_id(&source_id),
            source,
            source_id,
            title: title.into(),
            summary: String::new(),
            authors: Vec::new(),
            published_date: None,
            updated_date: None,
            categories: Vec::new(),
            primary_category: None,
            pdf_url: None,
            paper_url: None,
            doi: None,
            venue: None,
            citation_count: None,
            keywords: Vec::new(),
            extra_properties: HashMap::new(),
        }
    }

    /// Add a category unless it is already present
    pub fn add_category(&mut self, category: impl Into<String>) {
        let category = category.into();
        if !category.is_empty() && !self.categories.contains(&category) {
            self.categories.push(category);
        }
    }
}
