use collate_core_demux::{
    ClassifierConfig, HandlePool, LineClassifier, MemoryOpener, PoolConfig,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::io::Cursor;

/// Build `lines` records spread over `buckets` keys, with a directive every tenth line
fn make_input(lines: usize, buckets: u64) -> String {
    let mut input = String::with_capacity(lines * 16);
    let mut key: u64 = 1;
    for i in 0..lines {
        key = key
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407)
            % buckets;
        if i % 10 == 0 {
            input.push_str("# frame\n");
        }
        input.push_str(&format!("{} {} {}\n", i % 3, key, i));
    }
    input
}

/// Pool throughput with bucket counts below and above the open-handle cap
fn bench_bucket_spread(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucket_spread");

    for buckets in [16u64, 128, 1024].iter() {
        let input = make_input(20_000, *buckets);
        group.throughput(Throughput::Bytes(input.len() as u64));

        group.bench_with_input(BenchmarkId::new("classify", buckets), buckets, |b, _| {
            b.iter(|| {
                let mut pool = HandlePool::new(MemoryOpener::new(), PoolConfig::default());
                let mut classifier = LineClassifier::new(ClassifierConfig::new(1, None));
                classifier
                    .process(Cursor::new(input.as_bytes()), &mut pool)
                    .unwrap();
                pool.close_all().unwrap();
                black_box(classifier.stats(&pool));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_bucket_spread);
criterion_main!(benches);
