//! 状态跟踪和历史存储基准测试
//!
//! 测试每个检测周期中结果处理的热点路径

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use std::hint::black_box;
use uptime_vitals::health::{CheckResult, HistoryStore, MonitoringStats, StateTracker};
use uptime_vitals::report::Snapshot;

fn urls(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("https://service-{i}.example.com/health"))
        .collect()
}

/// 状态跟踪基准测试
fn state_tracker_benchmark(c: &mut Criterion) {
    let urls = urls(100);
    let results: Vec<_> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| CheckResult::new(url.clone(), i % 7 != 0).with_status_code(200))
        .collect();

    c.bench_function("tracker_update_100_urls", |b| {
        let mut tracker = StateTracker::new(2);
        b.iter(|| {
            for result in &results {
                black_box(tracker.update(black_box(result)));
            }
        });
    });

    c.bench_function("tracker_incident_cycle", |b| {
        let failure = CheckResult::new("https://down.example.com", false);
        let success = CheckResult::new("https://down.example.com", true);
        b.iter_batched(
            || StateTracker::new(3),
            |mut tracker| {
                for _ in 0..5 {
                    black_box(tracker.update(&failure));
                }
                black_box(tracker.update(&success))
            },
            BatchSize::SmallInput,
        );
    });
}

/// 历史存储基准测试
fn history_benchmark(c: &mut Criterion) {
    let result = CheckResult::new("https://example.com", true).with_status_code(200);

    c.bench_function("history_append_at_capacity", |b| {
        let mut store = HistoryStore::new(1000);
        for _ in 0..1000 {
            store.append("https://example.com", result.clone());
        }
        b.iter(|| store.append(black_box("https://example.com"), result.clone()));
    });
}

/// 快照生成基准测试
fn snapshot_benchmark(c: &mut Criterion) {
    let urls = urls(100);
    let mut history = HistoryStore::new(100);
    let mut tracker = StateTracker::new(2);
    let mut stats = MonitoringStats::default();

    for url in &urls {
        let result = CheckResult::new(url.clone(), true).with_status_code(200);
        stats.record(&result);
        tracker.update(&result);
        history.append(url, result);
    }

    c.bench_function("snapshot_capture_100_urls", |b| {
        b.iter(|| {
            let snapshot =
                Snapshot::capture(&urls, &history, &tracker, &stats, chrono::Utc::now());
            black_box(snapshot)
        });
    });
}

criterion_group!(
    benches,
    state_tracker_benchmark,
    history_benchmark,
    snapshot_benchmark
);
criterion_main!(benches);
