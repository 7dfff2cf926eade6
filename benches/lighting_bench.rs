use bevy::math::Vec2;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cave_core::config::{MapConfig, MapStyle};
use cave_core::lighting::RayCaster;
use cave_core::map::{cell_center, strategy_for, LevelSeed, MapBuilder, MapGeometry, MapLayout};

fn layout(style: MapStyle) -> MapLayout {
    let config = MapConfig {
        style,
        seed: 42,
        ..MapConfig::default()
    };
    let strategy = strategy_for(&config);
    let mut rng = LevelSeed::new(42).rng_for(0);
    MapBuilder::new(config).build(strategy.as_ref(), &mut rng).unwrap()
}

fn bench_visibility(c: &mut Criterion) {
    let cave = layout(MapStyle::Cellular);
    let origin = cell_center(cave.spawns.player, cave.tile_size);
    let caster = RayCaster::default();

    c.bench_function("cast_cellular_from_spawn", |b| {
        b.iter(|| caster.cast(black_box(origin), &cave.geometry))
    });

    let lights: Vec<Vec2> = cave
        .spawns
        .lights
        .iter()
        .map(|&cell| cell_center(cell, cave.tile_size))
        .collect();
    c.bench_function("cast_all_lights", |b| {
        b.iter(|| {
            for &light in &lights {
                black_box(caster.cast(light, &cave.geometry));
            }
        })
    });
}

fn bench_level_build(c: &mut Criterion) {
    for (name, style) in [("build_cellular", MapStyle::Cellular), ("build_wang", MapStyle::Wang)] {
        c.bench_function(name, |b| b.iter(|| layout(black_box(style))));
    }

    let cave = layout(MapStyle::Cellular);
    c.bench_function("geometry_from_grid", |b| {
        b.iter(|| MapGeometry::from_grid(black_box(&cave.grid), cave.tile_size))
    });
}

criterion_group!(benches, bench_visibility, bench_level_build);
criterion_main!(benches);
