use crate::client::providers::SourceProvider;
use crate::client::PaperSource;
use crate::resilience::TimeoutExt;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Outcome of one availability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HealthStatus {
    /// Probe succeeded
    Healthy,
    /// Probe completed and reported the source down
    Unavailable,
    /// Probe did not answer within the probe timeout
    TimedOut,
}

impl HealthStatus {
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Health of a single registered adapter
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHealth {
    pub source: PaperSource,
    pub name: String,
    pub priority: u32,
    pub status: HealthStatus,
    pub latency_ms: u64,
}

/// Probes adapters concurrently, each bounded by the probe timeout.
///
/// Nothing is cached: every call probes again.
#[derive(Debug, Clone)]
pub struct HealthReporter {
    probe_timeout: Duration,
}

impl Default for HealthReporter {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl HealthReporter {
    #[must_use]
    pub const fn new(probe_timeout: Duration) -> Self {
        Self { probe_timeout }
    }

    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Probe one adapter
    pub async fn probe(&self, provider: &dyn SourceProvider) -> SourceHealth {
        let start = Instant::now();
        let status = match provider
            .is_available()
            .with_timeout_duration(self.probe_timeout)
            .await
        {
            Ok(true) => HealthStatus::Healthy,
            Ok(false) => HealthStatus::Unavailable,
            Err(_) => {
                warn!(
                    source = %provider.source_type(),
                    "Health probe for {} timed out after {:?}",
                    provider.source_name(),
                    self.probe_timeout
                );
                HealthStatus::TimedOut
            }
        };

        let latency = start.elapsed();
        debug!(
            source = %provider.source_type(),
            ?status,
            ?latency,
            "Probed {}",
            provider.source_name()
        );

        SourceHealth {
            source: provider.source_type(),
            name: provider.source_name().to_string(),
            priority: provider.priority(),
            status,
            latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Probe every adapter concurrently; results keep the input order
    pub async fn check_all(&self, providers: &[Arc<dyn SourceProvider>]) -> Vec<SourceHealth> {
        join_all(providers.iter().map(|p| self.probe(p.as_ref()))).await
    }

    /// The adapters whose probe succeeded, in input order
    pub async fn available(
        &self,
        providers: &[Arc<dyn SourceProvider>],
    ) -> Vec<Arc<dyn SourceProvider>> {
        let report = self.check_all(providers).await;
        providers
            .iter()
            .zip(report)
            .filter(|(_, health)| health.status.is_healthy())
            .map(|(provider, _)| Arc::clone(provider))
            .collect()
    }
}
