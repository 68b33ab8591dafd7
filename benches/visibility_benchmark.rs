// benches/visibility_benchmark.rs
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lumen2d::engine_lib::edges::{build_edges, EdgeSet, MapMetrics};
use lumen2d::engine_lib::visibility::{compute_visibility, VisibilityConfig};
use lumen2d::generator::random_tiles;
use lumen2d::geometry::{Point2, Rect};
use lumen2d::rendering_lib::batch::{BufferKind, VertexBatcher};
use lumen2d::rendering_lib::vertex::Color;

const UNIT: f32 = 32.0;

fn create_map(size: i32, rng: &mut impl Rng) -> (EdgeSet, Vec<Point2>) {
    let tiles = random_tiles(size, size, 0.15, rng);
    let metrics = MapMetrics::new(size, UNIT, UNIT);
    let edges = build_edges(&tiles, &metrics);

    const NUM_ORIGINS: usize = 64;
    let extent = size as f32 * UNIT;
    let origins = (0..NUM_ORIGINS)
        .map(|_| Point2::new(rng.gen_range(UNIT..extent - UNIT), rng.gen_range(UNIT..extent - UNIT)))
        .collect();
    (edges, origins)
}

fn visibility_benchmark_fn(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let config = VisibilityConfig::default();

    let mut group = c.benchmark_group("Visibility");
    for size in [16, 32, 64] {
        let (edges, origins) = create_map(size, &mut rng);
        group.bench_with_input(BenchmarkId::new("compute_visibility", size), &size, |b, _| {
            let mut origin_iter = origins.iter().cycle();
            b.iter(|| {
                let origin = origin_iter.next().copied().unwrap_or(Point2::ZERO);
                compute_visibility(black_box(&edges.edges), black_box(&edges.points), origin, &config)
            })
        });
    }
    group.finish();
}

fn batch_benchmark_fn(c: &mut Criterion) {
    c.bench_function("append_1000_squares", |b| {
        let mut batcher = VertexBatcher::new();
        b.iter(|| {
            batcher.reset();
            for i in 0..1000 {
                let rect = Rect::new((i % 40) as f32 * UNIT, (i / 40) as f32 * UNIT, UNIT, UNIT);
                let _ = batcher.append_square(BufferKind::Geometry, black_box(rect), Color::WHITE);
            }
        })
    });
}

criterion_group!(benches, visibility_benchmark_fn, batch_benchmark_fn);
criterion_main!(benches);
