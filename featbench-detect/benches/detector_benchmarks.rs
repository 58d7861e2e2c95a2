use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use featbench_core::{DetectorFamily, Image, Keypoint};
use featbench_detect::{build_detector, BuiltinDetection, CornerDetector, KeypointSuppression};

/// Create benchmark image with realistic corner patterns
fn create_benchmark_image(width: u32, height: u32) -> Image {
    Image::from_fn(width, height, |x, y| {
        let gradient = ((x as f32 / width as f32) * 50.0) as u8;
        let noise = ((x * 7 + y * 13) % 11) as u8;
        let block = (x / 24 + y / 24) % 3 == 0;
        image::Luma([if block { 190 } else { 70 } + gradient / 2 + noise])
    })
}

/// Every detector family on the same frame
fn bench_detector_families(c: &mut Criterion) {
    let mut group = c.benchmark_group("detector_families");
    group.sample_size(10);
    let img = create_benchmark_image(320, 240);

    for family in DetectorFamily::ALL {
        let detector = build_detector(family, &BuiltinDetection).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(family), &img, |b, img| {
            b.iter(|| black_box(detector.detect(black_box(img)).unwrap()))
        });
    }
    group.finish();
}

/// Dense response maps used by the corner-grid detectors
fn bench_response_maps(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_maps");
    for &(width, height) in &[(128u32, 128u32), (256, 256)] {
        let img = create_benchmark_image(width, height);
        group.bench_with_input(BenchmarkId::new("harris", width), &img, |b, img| {
            b.iter(|| black_box(CornerDetector::harris_map(black_box(img), 2, 3, 0.04)))
        });
        group.bench_with_input(BenchmarkId::new("min_eigen", width), &img, |b, img| {
            b.iter(|| black_box(CornerDetector::min_eigen_map(black_box(img), 4, 3)))
        });
    }
    group.finish();
}

/// Overlap suppression cost as the accepted set grows
fn bench_overlap_suppression(c: &mut Criterion) {
    let candidates: Vec<Keypoint> = (0..2000)
        .map(|i| Keypoint::new((i % 100) as f32 * 4.0, (i / 100) as f32 * 4.0, 6.0).with_response((i * 37 % 255) as f32))
        .collect();

    c.bench_function("insert_with_overlap_2000", |b| {
        b.iter(|| {
            let mut accepted = Vec::new();
            for kp in black_box(&candidates) {
                KeypointSuppression::insert_with_overlap(&mut accepted, *kp, 0.0);
            }
            black_box(accepted)
        })
    });
}

criterion_group!(benches, bench_detector_families, bench_response_maps, bench_overlap_suppression);
criterion_main!(benches);
