//! Window store benchmark: record + density query, scan vs indexed, at full capacity.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nids_sensor::window::{IndexedWindow, ScanWindow, WindowStore};
use std::net::IpAddr;
use std::time::Duration;

const HORIZON: Duration = Duration::from_secs(2);

fn fill(store: &mut dyn WindowStore, sources: u8) -> u64 {
    let mut ts = 0;
    for i in 0..store.capacity() as u64 {
        ts = i * 500;
        store.record(ts, IpAddr::from([10, 0, 0, (i % u64::from(sources)) as u8]));
    }
    ts
}

fn bench_record_and_count(c: &mut Criterion) {
    let mut g = c.benchmark_group("window_record_count");
    for sources in [1u8, 16, 200] {
        let mut scan = ScanWindow::new(2000);
        let mut indexed = IndexedWindow::new(2000, HORIZON);
        let mut ts_scan = fill(&mut scan, sources);
        let mut ts_indexed = fill(&mut indexed, sources);
        let src = IpAddr::from([10, 0, 0, 0]);

        g.bench_with_input(BenchmarkId::new("scan", sources), &sources, |b, _| {
            b.iter(|| {
                ts_scan += 500;
                scan.record(ts_scan, src);
                black_box(scan.count_since(ts_scan, src, HORIZON))
            })
        });
        g.bench_with_input(BenchmarkId::new("indexed", sources), &sources, |b, _| {
            b.iter(|| {
                ts_indexed += 500;
                indexed.record(ts_indexed, src);
                black_box(indexed.count_since(ts_indexed, src, HORIZON))
            })
        });
    }
    g.finish();
}

criterion_group!(benches, bench_record_and_count);
criterion_main!(benches);
