#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use papertrail_search::{
    Paper, PaperSource, ProviderError, SearchRequest, SearchResponse, SourceProvider,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scripted adapter with call counters
pub struct MockProvider {
    source: PaperSource,
    name: String,
    priority: u32,
    papers: Vec<Paper>,
    total: Option<u32>,
    delay: Duration,
    fail: bool,
    panic: bool,
    available: AtomicBool,
    pub search_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub probe_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(source: PaperSource, priority: u32) -> Self {
        Self {
            source,
            name: source.display_name().to_string(),
            priority,
            papers: Vec::new(),
            total: None,
            delay: Duration::ZERO,
            fail: false,
            panic: false,
            available: AtomicBool::new(true),
            search_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_papers(mut self, papers: Vec<Paper>) -> Self {
        self.papers = papers;
        self
    }

    pub const fn with_total(mut self, total: u32) -> Self {
        self.total = Some(total);
        self
    }

    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub const fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub const fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    pub fn unavailable(self) -> Self {
        self.set_available(false);
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl SourceProvider for MockProvider {
    fn source_type(&self) -> PaperSource {
        self.source
    }

    fn source_name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn is_available(&self) -> bool {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.available.load(Ordering::SeqCst)
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ProviderError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        assert!(!self.panic, "scripted adapter panic");
        if self.fail {
            return Err(ProviderError::Network("connection refused".to_string()));
        }

        let count = u32::try_from(self.papers.len()).unwrap();
        Ok(SearchResponse::new(
            self.papers.clone(),
            self.total.unwrap_or(count),
            request.start,
            &request.query,
        ))
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Paper>, ProviderError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::ServiceUnavailable("down".to_string()));
        }
        Ok(self.papers.iter().find(|p| p.id == id).cloned())
    }
}

pub fn as_dyn(provider: &Arc<MockProvider>) -> Arc<dyn SourceProvider> {
    Arc::clone(provider) as Arc<dyn SourceProvider>
}

pub fn paper(source: PaperSource, native_id: &str, title: &str, year: Option<i32>) -> Paper {
    let mut paper = Paper::new(source, native_id, title);
    paper.published_date = year.map(|y| Utc.with_ymd_and_hms(y, 6, 1, 0, 0, 0).unwrap());
    paper
}

pub fn count_from(papers: &[Paper], source: PaperSource) -> usize {
    papers.iter().filter(|p| p.source == source).count()
}

/// `count` papers with distinct titles, newest first from `first_year` downwards
pub fn papers(source: PaperSource, count: usize, first_year: i32) -> Vec<Paper> {
    (0..count)
        .map(|i| {
            let offset = i32::try_from(i).unwrap();
            paper(
                source,
                &format!("{}-{i}", source.tag().to_lowercase()),
                &format!("{} paper number {i}", source.display_name()),
                Some(first_year - offset),
            )
        })
        .collect()
}
