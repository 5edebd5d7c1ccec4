use std::hint::black_box;
use std::time::Instant;

use echostep_common::{EntityId, Rect};
use echostep_spatial::SpatialGrid;

fn make_tiles(count: usize) -> Vec<(EntityId, Rect)> {
    let side = (count as f64).sqrt().ceil() as usize;
    (0..count)
        .map(|i| {
            let x = (i % side) as i32 * 16;
            let y = (i / side) as i32 * 16;
            (EntityId(i as u64 + 1), Rect::new(x, y, 16, 16))
        })
        .collect()
}

fn bench_rebuild(count: usize, iterations: usize) {
    let tiles = make_tiles(count);
    let mut grid = SpatialGrid::new(32).expect("cell size");

    let start = Instant::now();
    for _ in 0..iterations {
        grid.rebuild(black_box(tiles.iter().copied()));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  rebuild ({count} tiles, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_actor_query(count: usize, iterations: usize) {
    let mut grid = SpatialGrid::new(32).expect("cell size");
    grid.rebuild(make_tiles(count));

    // Player body grown by the resolver's search margin.
    let probe = Rect::new(80, 64, 12, 16).grow(32);
    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(grid.query(black_box(&probe)));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  actor query ({count} tiles, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_moving_update(count: usize, iterations: usize) {
    let mut grid = SpatialGrid::new(32).expect("cell size");
    grid.rebuild(make_tiles(count));
    let mover = EntityId(count as u64 + 1);

    let start = Instant::now();
    for i in 0..iterations {
        let x = (i % 160) as i32;
        grid.update(black_box(mover), Rect::new(x, 120, 48, 16));
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  moving update ({count} tiles, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn main() {
    println!("=== Spatial Grid Benchmarks ===\n");

    println!("Grid rebuild:");
    bench_rebuild(100, 1000);
    bench_rebuild(1000, 100);
    bench_rebuild(10000, 10);

    println!("\nActor query:");
    bench_actor_query(1000, 10000);
    bench_actor_query(10000, 10000);

    println!("\nMoving block update:");
    bench_moving_update(1000, 10000);

    println!("\n=== Done ===");
}
