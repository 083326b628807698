use criterion::{black_box, criterion_group, criterion_main, Criterion};
use probe_map::{ProbeSeq, PERTURB_ROUNDS};
use std::time::Duration;

// Fibonacci-hashed counters: well spread, no state to carry.
fn hashes(n: u64) -> impl Iterator<Item = u64> {
    (1..=n).map(|i| i.wrapping_mul(0x9e37_79b9_7f4a_7c15))
}

// Typical lookups stop within the first few candidates.
fn bench_first_candidates(c: &mut Criterion) {
    let seeds: Vec<u64> = hashes(10_000).collect();
    c.bench_function("seq::first_4_candidates_10k", |b| {
        b.iter(|| {
            let mut acc = 0usize;
            for &h in &seeds {
                for slot in ProbeSeq::new(h, 1 << 16).take(4) {
                    acc ^= slot;
                }
            }
            black_box(acc)
        })
    });
}

// Worst case: the full budget at a few table sizes.
fn bench_full_walk(c: &mut Criterion) {
    for shift in [3u32, 10, 16] {
        let cap = 1usize << shift;
        let name = format!("seq::full_walk_cap_{cap}_plus_{PERTURB_ROUNDS}");
        c.bench_function(&name, |b| {
            b.iter(|| black_box(ProbeSeq::new(black_box(0xfeed_f00d), cap).sum::<usize>()))
        });
    }
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(20)
        .measurement_time(Duration::from_secs(3))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_first_candidates, bench_full_walk
}
criterion_main!(benches);
