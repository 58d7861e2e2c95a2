use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use featbench_core::{DescriptorClass, Descriptors, MatcherKind, SelectorKind};
use featbench_match::DescriptorMatcher;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

fn random_binary(rows: usize, rng: &mut Pcg64) -> Descriptors {
    Descriptors::Binary {
        bytes_per_row: 32,
        data: (0..rows * 32).map(|_| rng.gen()).collect(),
    }
}

fn random_histograms(rows: usize, rng: &mut Pcg64) -> Descriptors {
    Descriptors::Float {
        dims: 128,
        data: (0..rows * 128).map(|_| rng.gen_range(0.0..255.0f32)).collect(),
    }
}

/// Both backends and selectors on frame-sized descriptor sets
fn bench_matchers(c: &mut Criterion) {
    let mut rng = Pcg64::seed_from_u64(42);
    let mut group = c.benchmark_group("matchers");
    group.sample_size(20);

    for &rows in &[100usize, 500] {
        let (prev_bin, curr_bin) = (random_binary(rows, &mut rng), random_binary(rows, &mut rng));
        let (prev_hist, curr_hist) = (random_histograms(rows, &mut rng), random_histograms(rows, &mut rng));

        for kind in [MatcherKind::BruteForce, MatcherKind::Flann] {
            for selector in [SelectorKind::NearestNeighbor, SelectorKind::KNearest] {
                let matcher = DescriptorMatcher::new(kind, selector, 0.8);
                let label = format!("{:?}_{:?}", kind, selector);
                group.bench_with_input(BenchmarkId::new(format!("binary_{}", label), rows), &rows, |b, _| {
                    b.iter(|| {
                        black_box(matcher.match_descriptors(&prev_bin, &curr_bin, DescriptorClass::Binary).unwrap())
                    })
                });
                group.bench_with_input(BenchmarkId::new(format!("sift_{}", label), rows), &rows, |b, _| {
                    b.iter(|| {
                        black_box(
                            matcher
                                .match_descriptors(&prev_hist, &curr_hist, DescriptorClass::Histogram)
                                .unwrap(),
                        )
                    })
                });
            }
        }
    }
    group.finish();
}

criterion_group!(benches, bench_matchers);
criterion_main!(benches);
