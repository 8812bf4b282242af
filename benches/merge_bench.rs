use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use papertrail_search::client::merge::dedup_key;
use papertrail_search::{MergePipeline, Paper, PaperSource, SearchRequest, SearchResponse};
use std::collections::HashMap;

fn source_response(source: PaperSource, count: usize, overlap: usize) -> SearchResponse {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let papers: Vec<Paper> = (0..count)
        .map(|i| {
            let title = if i < overlap {
                format!("Shared Result: number {i}!")
            } else {
                format!("{} exclusive result {i}", source.display_name())
            };
            let mut paper = Paper::new(source, i.to_string(), title);
            paper.published_date = Some(base - Duration::days(i64::try_from(i).unwrap()));
            paper
        })
        .collect();
    let total = u32::try_from(count).unwrap();
    SearchResponse::new(papers, total, 0, "bench")
}

fn bench_dedup_key(c: &mut Criterion) {
    let title = "  BERT: Pre-training of Deep   Bidirectional Transformers!! ";
    c.bench_function("dedup_key", |b| {
        b.iter(|| dedup_key(black_box(title)));
    });
}

fn bench_merge(c: &mut Criterion) {
    let pipeline = MergePipeline::new(HashMap::from([
        (PaperSource::Arxiv, 1),
        (PaperSource::Ieee, 2),
    ]));
    let request = SearchRequest::new("bench").with_paging(0, 50);

    let mut group = c.benchmark_group("merge");
    for per_source in [10usize, 100, 1000] {
        let responses = vec![
            (PaperSource::Arxiv, source_response(PaperSource::Arxiv, per_source, per_source / 2)),
            (PaperSource::Ieee, source_response(PaperSource::Ieee, per_source, per_source / 2)),
        ];
        group.bench_with_input(
            BenchmarkId::from_parameter(per_source),
            &responses,
            |b, responses| {
                b.iter(|| pipeline.merge(black_box(responses.clone()), &request));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_dedup_key, bench_merge);
criterion_main!(benches);
