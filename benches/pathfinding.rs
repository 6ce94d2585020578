use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tavern_sim::core::config::SimulationConfig;
use tavern_sim::core::types::Cell;
use tavern_sim::simulation::{run_simulation_tick, World};
use tavern_sim::spatial::{find_path, GridModel, Occupancy, WalkPolicy};

fn bench_find_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_path");
    let grid = GridModel::standard(false);
    let empty = Occupancy::empty();

    // Entrance to the bar service column, across the dance floor
    group.bench_function("door_to_bar", |b| {
        b.iter(|| {
            find_path(
                &grid,
                black_box(Cell::new(1, 6)),
                black_box(Cell::new(42, 16)),
                WalkPolicy::Standard,
                false,
                &empty,
            )
        })
    });

    // Corner to corner through the table area
    group.bench_function("corner_to_corner", |b| {
        b.iter(|| {
            find_path(
                &grid,
                black_box(Cell::new(1, 1)),
                black_box(Cell::new(40, 30)),
                WalkPolicy::Standard,
                false,
                &empty,
            )
        })
    });

    // The cat ignores furniture, so the open set stays small
    group.bench_function("relaxed_across_room", |b| {
        b.iter(|| {
            find_path(
                &grid,
                black_box(Cell::new(2, 28)),
                black_box(Cell::new(40, 3)),
                WalkPolicy::Relaxed,
                false,
                &empty,
            )
        })
    });

    let world = World::with_population(SimulationConfig::default()).ok();
    if let Some(world) = world {
        group.bench_function("door_to_bar_crowded", |b| {
            b.iter(|| {
                find_path(
                    &world.grid,
                    black_box(Cell::new(1, 6)),
                    black_box(Cell::new(42, 16)),
                    WalkPolicy::Standard,
                    true,
                    &world.occupancy(),
                )
            })
        });
    }

    group.finish();
}

fn bench_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    group.sample_size(20);
    group.bench_function("populated_600_ticks", |b| {
        b.iter_batched(
            || World::with_population(SimulationConfig::with_seed(0xBEEF)).ok(),
            |world| {
                if let Some(mut world) = world {
                    for _ in 0..600 {
                        black_box(run_simulation_tick(&mut world));
                    }
                }
            },
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_find_path, bench_ticks);
criterion_main!(benches);
