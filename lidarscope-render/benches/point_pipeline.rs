//! Benchmarks for the point and grid rendering pipelines

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lidarscope_core::{points_from_records, CameraPose, ChannelRecord, Point3D};
use lidarscope_render::{ColorMode, GridParams, GridRenderer, PointRenderer, RasterSurface, RecordingSurface};

fn generate_scan(channels: u32, returns: usize) -> Vec<Point3D> {
    let records: Vec<ChannelRecord> = (0..channels)
        .map(|channel| {
            let distances = (0..returns)
                .map(|i| {
                    let t = i as f32 / returns as f32 * std::f32::consts::TAU;
                    20.0 + 10.0 * (t * 3.0).sin() + channel as f32
                })
                .collect();
            ChannelRecord::new(channel, 100.0, channel as f32 * 1.1 - 1.1, distances)
        })
        .collect();
    points_from_records(&records)
}

fn bench_points(c: &mut Criterion) {
    let mut group = c.benchmark_group("points");
    let renderer = PointRenderer::new();
    let camera = CameraPose::top_down(2.0).with_rotation(0.3, 0.0, 0.2);

    for &returns in &[400, 4000, 40000] {
        let points = generate_scan(4, returns);

        group.bench_with_input(BenchmarkId::new("full", points.len()), &points, |b, points| {
            let mut surface = RecordingSurface::new(1280, 720);
            b.iter(|| {
                let stats = renderer.render(&mut surface, black_box(points), &camera, ColorMode::Distance, 2.0, false);
                surface.take_calls();
                black_box(stats);
            });
        });

        group.bench_with_input(BenchmarkId::new("lod", points.len()), &points, |b, points| {
            let mut surface = RecordingSurface::new(1280, 720);
            b.iter(|| {
                let stats = renderer.render(&mut surface, black_box(points), &camera, ColorMode::Distance, 2.0, true);
                surface.take_calls();
                black_box(stats);
            });
        });
    }

    let points = generate_scan(4, 4000);
    group.bench_function("raster_4000", |b| {
        let mut surface = RasterSurface::new(1280, 720);
        b.iter(|| {
            let stats = renderer.render(&mut surface, black_box(&points), &camera, ColorMode::Channel, 2.0, false);
            black_box(stats);
        });
    });

    group.finish();
}

fn bench_grid(c: &mut Criterion) {
    let renderer = GridRenderer::default();
    let params = GridParams::default();

    c.bench_function("grid_raster_tilted", |b| {
        let camera = CameraPose::top_down(1.0).with_rotation(0.8, 0.0, 0.4);
        b.iter(|| {
            let mut surface = RasterSurface::new(1280, 720);
            black_box(renderer.render(&mut surface, &camera, &params));
        });
    });
}

criterion_group!(benches, bench_points, bench_grid);
criterion_main!(benches);
