//! # Collision Scan Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use nav_lib::{
    geom::generate_cubic_path,
    planner::collision::{find_opening, opening_window, scan_swath},
    sim::{straight_road_grid, Band},
};

fn collision_scan_benchmark(c: &mut Criterion) {
    // ---- Build the road and path ----

    // 200 m road at 0.1 m resolution with an obstacle half way along
    let grid = straight_road_grid(
        200.0,
        8.0,
        0.1,
        &[Band {
            min_m: [99.5, -3.0],
            max_m: [100.5, 3.0],
        }],
    )
    .unwrap();

    // Gently curving path through the middle of the road
    let xs = [0.0, 50.0, 100.0, 150.0, 200.0];
    let ys = [0.0, 1.0, 0.0, -1.0, 0.0];
    let path = generate_cubic_path(&xs, &ys, 0.1).unwrap();

    c.bench_function("scan_swath", |b| b.iter(|| scan_swath(&path, &grid, 1.0)));

    c.bench_function("opening_window + find_opening", |b| {
        b.iter(|| find_opening(&opening_window(&path, &grid, 1000)))
    });
}

criterion_group!(benches, collision_scan_benchmark);
criterion_main!(benches);
