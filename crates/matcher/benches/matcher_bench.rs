use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use fingerprint::{fingerprint_keypoints, FingerprintConfig, Keypoint};
use index::FingerprintIndex;
use matcher::{score, MatchConfig};

fn frame_keypoints(seed: usize, n: usize) -> Vec<Keypoint> {
    (0..n)
        .map(|i| {
            let f = (i + seed * 7919) as f64;
            Keypoint::new(
                (f * 37.17) % 1920.0,
                (f * 91.31) % 1080.0,
                2.0 + (f * 0.37) % 14.0,
                (f * 53.0) % 360.0,
            )
        })
        .collect()
}

fn bench_score(c: &mut Criterion) {
    let cfg = FingerprintConfig::default();
    let mut group = c.benchmark_group("score");

    for frames in [10usize, 50, 200] {
        let index = FingerprintIndex::from_entries((0..frames).map(|f| {
            let fp = fingerprint_keypoints(&frame_keypoints(f, 1500), &cfg).expect("fingerprint");
            (format!("frame{f}-full.jpg"), fp)
        }))
        .expect("index");
        let query = fingerprint_keypoints(&frame_keypoints(frames / 2, 300), &cfg).expect("query");
        let match_cfg = MatchConfig::default();

        group.throughput(Throughput::Elements(frames as u64));
        group.bench_function(format!("frames_{frames}"), |b| {
            b.iter(|| score(black_box(&query), black_box(&index), &match_cfg))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_score);
criterion_main!(benches);
