use criterion::{black_box, criterion_group, criterion_main, Criterion};
use frozen_table::{Column, ColumnRegistry, Pane};

fn create_registry(count: usize, frozen: usize) -> ColumnRegistry {
    ColumnRegistry::with_columns((0..count).map(|i| {
        Column::new(format!("col_{}", i))
            .with_frozen(i < frozen)
            .with_visible(i % 7 != 3)
    }))
    .unwrap()
}

fn benchmark_lookups(c: &mut Criterion) {
    let registry = create_registry(200, 5);
    let mut group = c.benchmark_group("column_mapping");

    group.bench_function("to_visual_index_200", |b| {
        b.iter(|| {
            for logical in 0..registry.len() {
                black_box(registry.to_visual_index(black_box(logical)));
            }
        })
    });

    group.bench_function("to_logical_index_200", |b| {
        b.iter(|| {
            for visual in 0..registry.visible_count() {
                black_box(registry.to_logical_index(Pane::Normal, black_box(visual)));
            }
        })
    });

    group.finish();
}

fn benchmark_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_mapping_rebuild");

    // every toggle invalidates the cached mapping
    group.bench_function("toggle_visible_then_lookup", |b| {
        let mut registry = create_registry(200, 5);
        let mut visible = false;
        b.iter(|| {
            registry.set_visible(100, visible).unwrap();
            visible = !visible;
            black_box(registry.to_visual_index(150))
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_lookups, benchmark_rebuild);
criterion_main!(benches);
