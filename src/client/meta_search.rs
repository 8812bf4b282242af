use crate::client::merge::MergePipeline;
use crate::client::providers::{
    ArxivProvider, IeeeProvider, SearchRequest, SearchResponse, SourceProvider,
};
use crate::client::registry::ProviderRegistry;
use crate::client::{Paper, PaperSource};
use crate::resilience::{HealthReporter, SourceHealth, TimeoutExt};
use crate::{Config, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Configuration for meta-search behavior
#[derive(Debug, Clone)]
pub struct MetaSearchConfig {
    /// Shared deadline for all sources of one search
    pub deadline: Duration,
    /// Timeout for each availability probe
    pub probe_timeout: Duration,
}

impl Default for MetaSearchConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&Config> for MetaSearchConfig {
    fn from(config: &Config) -> Self {
        Self {
            deadline: config.deadline(),
            probe_timeout: config.probe_timeout(),
        }
    }
}

/// How a search request is going to be served
enum Dispatch {
    Empty,
    /// One adapter, no fan-out; `probe` is set when availability is still unknown
    Single {
        provider: Arc<dyn SourceProvider>,
        probe: bool,
    },
    FanOut {
        providers: Vec<Arc<dyn SourceProvider>>,
        probe: bool,
    },
}

/// What became of one dispatched search task
enum TaskOutcome {
    Completed(SearchResponse),
    /// The probe reported the source unavailable; nothing was searched
    Skipped,
    /// Panicked or missed the deadline
    Lost,
}

/// Responses gathered from a fan-out, plus every source that was actually searched
#[derive(Default)]
struct Collected {
    responses: Vec<(PaperSource, SearchResponse)>,
    dispatched: BTreeSet<PaperSource>,
}

impl Collected {
    fn record(&mut self, source: PaperSource, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Completed(response) => {
                self.dispatched.insert(source);
                self.responses.push((source, response));
            }
            TaskOutcome::Lost => {
                self.dispatched.insert(source);
            }
            TaskOutcome::Skipped => {}
        }
    }
}

/// Client that performs meta-search across multiple academic sources
pub struct MetaSearchClient {
    registry: ProviderRegistry,
    merger: MergePipeline,
    health: HealthReporter,
    config: MetaSearchConfig,
}

impl MetaSearchClient {
    #[must_use]
    pub fn new(registry: ProviderRegistry, config: MetaSearchConfig) -> Self {
        let merger = MergePipeline::new(registry.priorities());
        let health = HealthReporter::new(config.probe_timeout);

        info!(
            "Initialized meta-search client with {} providers",
            registry.len()
        );

        Self {
            registry,
            merger,
            health,
            config,
        }
    }

    /// Build the client with every adapter enabled in `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = config.http.client_config();
        let mut providers: Vec<Arc<dyn SourceProvider>> = Vec::new();

        if config.arxiv.enabled {
            providers.push(Arc::new(
                ArxivProvider::new(&http)?
                    .with_base_url(config.arxiv.base_url.clone())
                    .with_priority(config.arxiv.priority)
                    .with_probe_timeout(config.probe_timeout()),
            ));
        }

        if config.ieee.enabled {
            providers.push(Arc::new(
                IeeeProvider::new(&http, config.ieee.api_key.clone())?
                    .with_base_url(config.ieee.base_url.clone())
                    .with_priority(config.ieee.priority)
                    .with_probe_timeout(config.probe_timeout()),
            ));
        }

        Ok(Self::new(
            ProviderRegistry::new(providers),
            MetaSearchConfig::from(config),
        ))
    }

    #[must_use]
    pub const fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Names of the registered providers, in priority order
    #[must_use]
    pub fn providers(&self) -> Vec<String> {
        self.registry
            .all()
            .iter()
            .map(|p| p.source_name().to_string())
            .collect()
    }

    /// Search the requested sources and merge their results.
    ///
    /// Only invalid input is reported as an error; unavailable, failing or slow
    /// sources simply contribute no papers.
    #[instrument(
        skip(self, request),
        fields(request_id = %Uuid::new_v4(), query = %request.query)
    )]
    pub async fn search_papers(&self, request: &SearchRequest) -> Result<SearchResponse> {
        request.validate()?;

        let started = Instant::now();
        let deadline = started + self.config.deadline;
        info!(
            "Starting meta-search for: {} (field: {})",
            request.query, request.search_field
        );

        let mut response = match self.resolve(request).await {
            Dispatch::Empty => {
                info!("No data source to search");
                SearchResponse::empty(request)
            }
            Dispatch::Single { provider, probe } => {
                self.search_single(provider, probe, request, deadline).await
            }
            Dispatch::FanOut { providers, probe } => {
                let request = Arc::new(request.clone());
                let collected = if request.enable_parallel_search {
                    self.fan_out(providers, probe, &request, deadline).await
                } else {
                    self.search_sequential(providers, probe, &request, deadline)
                        .await
                };
                let mut response = self.merger.merge(collected.responses, &request);
                response.searched_sources = collected.dispatched;
                response
            }
        };

        let elapsed = started.elapsed();
        response.search_time_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        info!(
            papers = response.papers.len(),
            total = response.total_results,
            elapsed_ms = response.search_time_ms,
            "Meta-search completed"
        );

        Ok(response)
    }

    async fn resolve(&self, request: &SearchRequest) -> Dispatch {
        if request.data_sources.is_empty() {
            let mut available = self
                .health
                .available(&self.registry.primary_providers())
                .await;
            debug!("{} sources available", available.len());
            return match available.len() {
                0 => Dispatch::Empty,
                1 => Dispatch::Single {
                    provider: available.remove(0),
                    probe: false,
                },
                _ => Dispatch::FanOut {
                    providers: available,
                    probe: false,
                },
            };
        }

        for source in &request.data_sources {
            if !self.registry.contains(*source) {
                warn!(source = %source, "Requested data source is not registered");
            }
        }

        if request.data_sources.len() == 1 {
            return request
                .data_sources
                .iter()
                .next()
                .and_then(|source| self.registry.get(*source))
                .map_or(Dispatch::Empty, |provider| Dispatch::Single {
                    provider,
                    probe: true,
                });
        }

        let providers: Vec<_> = self
            .registry
            .primary_providers()
            .into_iter()
            .filter(|p| request.data_sources.contains(&p.source_type()))
            .collect();

        Dispatch::FanOut {
            providers,
            probe: true,
        }
    }

    /// Serve a request from one adapter, returning its page as reported
    async fn search_single(
        &self,
        provider: Arc<dyn SourceProvider>,
        probe: bool,
        request: &SearchRequest,
        deadline: Instant,
    ) -> SearchResponse {
        let source = provider.source_type();
        let outcome = Self::search_source(provider, request, probe.then_some(&self.health))
            .with_deadline(deadline)
            .await;

        let (mut response, searched) = match outcome {
            Ok(Some(response)) => (response, true),
            Ok(None) => (SearchResponse::empty(request), false),
            Err(e) => {
                warn!(source = %source, "Search abandoned: {}", e);
                (SearchResponse::empty(request), true)
            }
        };

        if request.enable_deduplication {
            response.papers = self.merger.deduplicate(response.papers);
        }
        response.deduplication_applied = request.enable_deduplication;
        response.searched_sources = if searched {
            BTreeSet::from([source])
        } else {
            BTreeSet::new()
        };
        response
    }

    /// Search all providers concurrently and keep what completes before `deadline`
    async fn fan_out(
        &self,
        providers: Vec<Arc<dyn SourceProvider>>,
        probe: bool,
        request: &Arc<SearchRequest>,
        deadline: Instant,
    ) -> Collected {
        let names: Vec<_> = providers.iter().map(|p| p.source_name()).collect();
        info!(
            "Searching {} sources in parallel: {:?}",
            providers.len(),
            names
        );

        let tasks: Vec<_> = providers
            .into_iter()
            .map(|provider| {
                let source = provider.source_type();
                (source, self.spawn_search(provider, probe, request))
            })
            .collect();

        let mut collected = Collected::default();
        for (source, task) in tasks {
            collected.record(source, Self::collect(source, task, deadline).await);
        }
        collected
    }

    /// Search providers one after another in priority order under the same deadline
    async fn search_sequential(
        &self,
        providers: Vec<Arc<dyn SourceProvider>>,
        probe: bool,
        request: &Arc<SearchRequest>,
        deadline: Instant,
    ) -> Collected {
        let mut collected = Collected::default();
        for provider in providers {
            let source = provider.source_type();
            if Instant::now() >= deadline {
                warn!(source = %source, "Deadline reached, skipping remaining sources");
                break;
            }
            let task = self.spawn_search(provider, probe, request);
            collected.record(source, Self::collect(source, task, deadline).await);
        }
        collected
    }

    fn spawn_search(
        &self,
        provider: Arc<dyn SourceProvider>,
        probe: bool,
        request: &Arc<SearchRequest>,
    ) -> JoinHandle<Option<SearchResponse>> {
        let request = Arc::clone(request);
        let health = probe.then(|| self.health.clone());
        tokio::spawn(async move {
            Self::search_source(provider, &request, health.as_ref()).await
        })
    }

    /// Await a search task until `deadline`; a task still running is left detached
    async fn collect(
        source: PaperSource,
        task: JoinHandle<Option<SearchResponse>>,
        deadline: Instant,
    ) -> TaskOutcome {
        match task.with_deadline(deadline).await {
            Ok(Ok(Some(response))) => TaskOutcome::Completed(response),
            Ok(Ok(None)) => TaskOutcome::Skipped,
            Ok(Err(e)) => {
                error!(source = %source, "Search task failed: {}", e);
                TaskOutcome::Lost
            }
            Err(_) => {
                warn!(
                    source = %source,
                    "Source missed the search deadline, discarding its results"
                );
                TaskOutcome::Lost
            }
        }
    }

    /// Run one adapter's search; `None` when the probe reports it unavailable.
    ///
    /// Adapter errors become an empty page for that source.
    async fn search_source(
        provider: Arc<dyn SourceProvider>,
        request: &SearchRequest,
        health: Option<&HealthReporter>,
    ) -> Option<SearchResponse> {
        let source = provider.source_type();

        if let Some(health) = health {
            if !health.probe(provider.as_ref()).await.status.is_healthy() {
                info!(source = %source, "Skipping unavailable source {}", provider.source_name());
                return None;
            }
        }

        match provider.search(request).await {
            Ok(response) => {
                info!(
                    source = %source,
                    papers = response.papers.len(),
                    total = response.total_results,
                    "Provider {} returned results",
                    provider.source_name()
                );
                Some(response)
            }
            Err(e) => {
                warn!(source = %source, "Provider {} failed: {}", provider.source_name(), e);
                Some(SearchResponse::empty(request))
            }
        }
    }

    /// Look up a paper by composite id.
    ///
    /// The adapter named by the id prefix is asked first; every other available
    /// adapter is then tried in priority order.
    #[instrument(skip(self))]
    pub async fn get_paper_by_id(&self, id: &str) -> Option<Paper> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }

        let primary = PaperSource::parse_from_id(id).and_then(|source| self.registry.get(source));
        if let Some(provider) = &primary {
            if let Some(paper) = self.fetch_from(provider.as_ref(), id).await {
                return Some(paper);
            }
        } else {
            debug!("No adapter registered for the prefix of {}", id);
        }

        for provider in self.registry.primary_providers() {
            if primary.as_ref().is_some_and(|p| Arc::ptr_eq(p, &provider)) {
                continue;
            }
            if let Some(paper) = self.fetch_from(provider.as_ref(), id).await {
                return Some(paper);
            }
        }

        info!("Paper {} not found in any provider", id);
        None
    }

    async fn fetch_from(&self, provider: &dyn SourceProvider, id: &str) -> Option<Paper> {
        let source = provider.source_type();
        if !self.health.probe(provider).await.status.is_healthy() {
            debug!(source = %source, "Skipping unavailable source for lookup");
            return None;
        }

        match provider
            .fetch_by_id(id)
            .with_timeout_duration(self.config.deadline)
            .await
        {
            Ok(Ok(Some(paper))) => {
                info!(source = %source, "Found paper {} in {}", id, provider.source_name());
                Some(paper)
            }
            Ok(Ok(None)) => {
                debug!(source = %source, "Paper {} not found in {}", id, provider.source_name());
                None
            }
            Ok(Err(e)) => {
                warn!(source = %source, "Lookup of {} failed: {}", id, e);
                None
            }
            Err(e) => {
                warn!(source = %source, "Lookup of {} abandoned: {}", id, e);
                None
            }
        }
    }

    /// Sources whose adapter currently reports available; probed on every call
    pub async fn list_available_sources(&self) -> BTreeSet<PaperSource> {
        self.health
            .check_all(self.registry.all())
            .await
            .into_iter()
            .filter(|h| h.status.is_healthy())
            .map(|h| h.source)
            .collect()
    }

    /// Availability of every registered adapter keyed by its name
    pub async fn data_source_health(&self) -> BTreeMap<String, bool> {
        let mut health = BTreeMap::new();
        for report in self.health.check_all(self.registry.all()).await {
            health
                .entry(report.name)
                .or_insert_with(|| report.status.is_healthy());
        }
        health
    }

    /// Probe status and latency of every registered adapter
    pub async fn health_report(&self) -> Vec<SourceHealth> {
        let report = self.health.check_all(self.registry.all()).await;
        for entry in &report {
            if entry.status.is_healthy() {
                info!("Provider {} is healthy", entry.name);
            } else {
                warn!("Provider {} is {:?}", entry.name, entry.status);
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_client() -> MetaSearchClient {
        MetaSearchClient::new(ProviderRegistry::default(), MetaSearchConfig::default())
    }

    #[test]
    fn test_client_from_default_config() {
        let client = MetaSearchClient::from_config(&Config::default()).unwrap();
        assert_eq!(client.providers(), vec!["arXiv", "IEEE Xplore"]);
        assert_eq!(client.registry().priority_of(PaperSource::Arxiv), 1);
    }

    #[test]
    fn test_disabled_sources_are_not_registered() {
        let mut config = Config::default();
        config.ieee.enabled = false;
        let client = MetaSearchClient::from_config(&config).unwrap();
        assert_eq!(client.providers(), vec!["arXiv"]);
        assert!(!client.registry().contains(PaperSource::Ieee));
    }

    #[tokio::test]
    async fn test_invalid_request_rejected() {
        let client = empty_client();
        let result = client.search_papers(&SearchRequest::new("   ")).await;
        assert!(matches!(result, Err(crate::Error::InvalidInput { .. })));

        let result = client
            .search_papers(&SearchRequest::new("q").with_paging(0, 101))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_registry_yields_empty_response() {
        let client = empty_client();
        let response = client
            .search_papers(&SearchRequest::new("q").with_paging(5, 10))
            .await
            .unwrap();
        assert!(response.papers.is_empty());
        assert_eq!(response.total_results, 0);
        assert_eq!(response.items_per_page, 0);
        assert_eq!(response.start_index, 5);
        assert!(client.get_paper_by_id("arxiv_1").await.is_none());
        assert!(client.list_available_sources().await.is_empty());
    }
}
