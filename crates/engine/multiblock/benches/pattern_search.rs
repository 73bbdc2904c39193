//! Benchmark for structure validation
//!
//! Measures a full search of a 5x5x5 casing frame, once matching and
//! once failing on the last aisle, with every rotation enabled.

use criterion::{criterion_group, criterion_main, Criterion};
use multiblock::pattern::{BlockPattern, Predicate};
use multiblock::world::{GridWorld, Occupant};
use multiblock::BlockPos;
use std::hint::black_box;

const SIZE: i32 = 5;

fn shell_pattern() -> BlockPattern {
    let full = "CCCCC";
    let hollow = "C   C";
    let solid = vec![full; SIZE as usize];
    let mut middle = vec![full];
    middle.extend(std::iter::repeat(hollow).take(SIZE as usize - 2));
    middle.push(full);
    let mut front = middle.clone();
    front[0] = "CCSCC";

    BlockPattern::builder()
        .aisle(front)
        .aisle(middle.clone())
        .aisle(middle.clone())
        .aisle(middle)
        .aisle(solid)
        .symbol('C', Predicate::blocks(["mbd:casing"]))
        .symbol('S', Predicate::controller("mbd:tank"))
        .allow_rotations()
        .build()
        .expect("shell pattern is valid")
}

/// World holding a complete shell around a controller at the origin
fn shell_world() -> GridWorld {
    let mut world = GridWorld::default();
    world.fill(
        BlockPos::new(-2, 0, 0),
        BlockPos::new(2, SIZE - 1, SIZE - 1),
        &Occupant::block("mbd:casing"),
    );
    world.set(BlockPos::ORIGIN, Occupant::component("mbd:tank"));
    world
}

fn bench_search(c: &mut Criterion) {
    let pattern = shell_pattern();
    let controller = BlockPos::ORIGIN;

    let world = shell_world();
    c.bench_function("search_formed_shell", |b| {
        b.iter(|| black_box(pattern.search(&world, black_box(controller)).is_ok()))
    });

    let mut broken = shell_world();
    broken.remove(BlockPos::new(2, SIZE - 1, SIZE - 1));
    c.bench_function("search_broken_shell", |b| {
        b.iter(|| black_box(pattern.search(&broken, black_box(controller)).is_err()))
    });
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
