pub mod client;
pub mod config;
pub mod error;
pub mod resilience;

pub use crate::client::providers::{
    ArxivProvider, IeeeProvider, ProviderError, SearchField, SearchRequest, SearchResponse,
    SortBy, SortOrder, SourceProvider,
};
pub use crate::client::{
    MergePipeline, MetaSearchClient, MetaSearchConfig, Paper, PaperSource, ProviderRegistry,
};
pub use crate::config::{Config, ConfigOverrides};
pub use crate::error::{Error, Result};
pub use crate::resilience::{HealthReporter, HealthStatus, SourceHealth, TimeoutExt};
