use crate::client::providers::SourceProvider;
use crate::client::PaperSource;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Adapters known to the aggregation engine, ordered by priority.
///
/// Lookup by source is first-registered-wins; a later adapter for the same source
/// still takes part in probes but is never chosen for that source.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn SourceProvider>>,
    by_source: HashMap<PaperSource, Arc<dyn SourceProvider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn SourceProvider>>) -> Self {
        let mut by_source: HashMap<PaperSource, Arc<dyn SourceProvider>> = HashMap::new();
        for provider in &providers {
            let source = provider.source_type();
            if by_source.contains_key(&source) {
                debug!(
                    source = %source,
                    "Ignoring duplicate adapter {} for lookup",
                    provider.source_name()
                );
                continue;
            }
            by_source.insert(source, Arc::clone(provider));
        }

        let mut providers = providers;
        providers.sort_by_key(|p| p.priority());

        Self {
            providers,
            by_source,
        }
    }

    /// Every registered adapter in ascending priority order
    #[must_use]
    pub fn all(&self) -> &[Arc<dyn SourceProvider>] {
        &self.providers
    }

    /// Adapters chosen for lookup, one per source, in ascending priority order
    #[must_use]
    pub fn primary_providers(&self) -> Vec<Arc<dyn SourceProvider>> {
        self.providers
            .iter()
            .filter(|p| {
                self.by_source
                    .get(&p.source_type())
                    .is_some_and(|chosen| Arc::ptr_eq(chosen, p))
            })
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn get(&self, source: PaperSource) -> Option<Arc<dyn SourceProvider>> {
        self.by_source.get(&source).cloned()
    }

    #[must_use]
    pub fn contains(&self, source: PaperSource) -> bool {
        self.by_source.contains_key(&source)
    }

    /// Priority of the adapter serving `source`, `u32::MAX` when none is registered
    #[must_use]
    pub fn priority_of(&self, source: PaperSource) -> u32 {
        self.by_source
            .get(&source)
            .map_or(u32::MAX, |p| p.priority())
    }

    /// Priority table for every registered source
    #[must_use]
    pub fn priorities(&self) -> HashMap<PaperSource, u32> {
        self.by_source
            .iter()
            .map(|(source, provider)| (*source, provider.priority()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.providers
                    .iter()
                    .map(|p| (p.source_type(), p.source_name().to_string(), p.priority())),
            )
            .finish()
    }
}
