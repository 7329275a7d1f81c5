use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mosaic_bench::util::generate_occupied_rects;
use mosaic_core::Vec2;
use mosaic_graph::PlacementFinder;
use std::hint::black_box;

fn bench_find_position(c: &mut Criterion) {
    let finder = PlacementFinder::default();
    let size = Vec2::new(200.0, 150.0);
    let mut group = c.benchmark_group("find_non_overlapping_position");

    for count in [16, 100, 400] {
        let existing = generate_occupied_rects(count);
        // Aim at the middle of the occupied block so the search has to walk out.
        let centre = Vec2::new(
            existing.iter().map(|r| r.center().x).sum::<f64>() / count as f64,
            existing.iter().map(|r| r.center().y).sum::<f64>() / count as f64,
        );
        group.bench_with_input(BenchmarkId::from_parameter(count), &existing, |b, existing| {
            b.iter(|| black_box(finder.find(black_box(centre), size, existing, 20.0)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_find_position);
criterion_main!(benches);
