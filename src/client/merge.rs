use crate::client::providers::{SearchRequest, SearchResponse, MAX_RESULTS_LIMIT};
use crate::client::{Paper, PaperSource};
use regex::Regex;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;
use tracing::debug;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("static pattern compiles"));

/// Normalized title used to detect the same paper across sources.
///
/// Lowercases, strips everything outside `[a-zA-Z0-9\s]` and collapses whitespace.
#[must_use]
pub fn dedup_key(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = NON_ALPHANUMERIC.replace_all(&lowered, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Combines per-source responses into one ranked, paginated response
#[derive(Debug, Clone, Default)]
pub struct MergePipeline {
    priorities: HashMap<PaperSource, u32>,
}

impl MergePipeline {
    #[must_use]
    pub const fn new(priorities: HashMap<PaperSource, u32>) -> Self {
        Self { priorities }
    }

    fn priority(&self, source: PaperSource) -> u32 {
        self.priorities.get(&source).copied().unwrap_or(u32::MAX)
    }

    /// Drop title duplicates, keeping the occurrence from the lowest priority value
    /// at the position the title was first seen.
    #[must_use]
    pub fn deduplicate(&self, papers: Vec<Paper>) -> Vec<Paper> {
        let original_count = papers.len();
        let mut unique: Vec<Paper> = Vec::with_capacity(original_count);
        let mut seen: HashMap<String, usize> = HashMap::new();

        for paper in papers {
            match seen.entry(dedup_key(&paper.title)) {
                Entry::Occupied(slot) => {
                    let idx = *slot.get();
                    if self.priority(paper.source) < self.priority(unique[idx].source) {
                        unique[idx] = paper;
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(unique.len());
                    unique.push(paper);
                }
            }
        }

        debug!(
            "Deduplicated {} papers to {} unique papers",
            original_count,
            unique.len()
        );
        unique
    }

    /// Stable sort by source priority, then newest first with undated papers last
    pub fn sort(&self, papers: &mut [Paper]) {
        papers.sort_by(|a, b| {
            self.priority(a.source)
                .cmp(&self.priority(b.source))
                .then_with(|| b.published_date.cmp(&a.published_date))
        });
    }

    /// Slice out the requested page, clamped to the list
    #[must_use]
    pub fn paginate(papers: Vec<Paper>, start: u32, max_results: u32) -> Vec<Paper> {
        let start = usize::try_from(start).unwrap_or(usize::MAX);
        if start >= papers.len() {
            return Vec::new();
        }
        let size = max_results.clamp(1, MAX_RESULTS_LIMIT) as usize;
        papers.into_iter().skip(start).take(size).collect()
    }

    /// Merge completed per-source responses for `request`
    #[must_use]
    pub fn merge(
        &self,
        responses: Vec<(PaperSource, SearchResponse)>,
        request: &SearchRequest,
    ) -> SearchResponse {
        let mut total_results: u32 = 0;
        let mut source_statistics: BTreeMap<String, u32> = BTreeMap::new();
        let mut searched_sources = BTreeSet::new();
        let mut papers = Vec::new();

        for (source, response) in responses {
            total_results = total_results.saturating_add(response.total_results);
            let count = u32::try_from(response.papers.len()).unwrap_or(u32::MAX);
            let entry = source_statistics
                .entry(source.display_name().to_string())
                .or_insert(0);
            *entry = entry.saturating_add(count);
            searched_sources.insert(source);
            papers.extend(response.papers);
        }

        if request.enable_deduplication {
            papers = self.deduplicate(papers);
        }
        self.sort(&mut papers);
        let page = Self::paginate(papers, request.start, request.max_results);

        let mut response = SearchResponse::new(page, total_results, request.start, &request.query);
        response.source_statistics = Some(source_statistics);
        response.searched_sources = searched_sources;
        response.deduplication_applied = request.enable_deduplication;
        response
    }
}
