use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use droptables::serialization::rules_from_json;
use droptables::{
    AlterationRegistry, BasicItemDrop, DropableWrapper, HolderIdentity, InMemoryDropTables,
    InMemoryDropable, ItemDropChance, ItemGenerator, NoCatalog, TargetType,
};

const RULES: &str = r#"[
    {
        "uid": "bench.chests",
        "target_type": "LootContainer",
        "matcher": {"type": "any", "constraints": [
            {"type": "scene", "scene": "Berg"},
            {"type": "region", "region": "Chersonese"}
        ]},
        "alterations": [
            {"type": "add_guaranteed_drops", "first_match_only": false, "drops": [
                {"item_id": 9000, "min_drop_count": 1, "max_drop_count": 3}
            ]},
            {"type": "remove_guaranteed_drops", "items_to_remove": [3, 7, 11]},
            {"type": "add_chance_drops", "drops": [
                {"type": "relative", "item_id": 9001, "relative_chance": 0.5}
            ]},
            {"type": "modify_chance_drops", "first_match_only": false, "modified_drops": [
                {"item_id": 5, "drop_chance": 40}
            ]}
        ]
    }
]"#;

fn make_chest() -> InMemoryDropable {
    // 4 guaranteed and 4 chance containers with 32 drops each.
    let mut chest = InMemoryDropable::new(HolderIdentity::named("Chest_Bench").in_scene("Berg"));
    for c in 0..4 {
        chest = chest
            .with_guaranteed(ItemGenerator::named(
                format!("Pouch_{c}"),
                (0..32).map(|i| BasicItemDrop::new(i, 1, 2)).collect(),
            ))
            .with_chance(ItemGenerator::named(
                format!("Loot_{c}"),
                (0..32).map(|i| ItemDropChance::new(i, 1, 1, 10 + i)).collect(),
            ));
    }
    chest
}

fn make_registry() -> AlterationRegistry {
    let mut registry = AlterationRegistry::new();
    registry.load(rules_from_json(RULES).unwrap(), &InMemoryDropTables::new());
    registry
}

fn bench_simulated_update(c: &mut Criterion) {
    let registry = make_registry();
    let chest = make_chest();

    let mut group = c.benchmark_group("alterations");
    group.throughput(Throughput::Elements(1));
    group.bench_function("simulated_update", |b| {
        b.iter(|| {
            let mut wrapper = DropableWrapper::simulated(black_box(&chest));
            black_box(registry.try_update(TargetType::LootContainer, &mut wrapper))
        });
    });
    group.bench_function("live_update_fresh_holder", |b| {
        b.iter_batched(
            make_chest,
            |mut chest| {
                let mut wrapper = DropableWrapper::live(&mut chest);
                black_box(registry.try_update(TargetType::LootContainer, &mut wrapper))
            },
            criterion::BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_report(c: &mut Criterion) {
    let registry = make_registry();
    let chest = make_chest();
    let mut wrapper = DropableWrapper::simulated(&chest);
    registry.try_update(TargetType::LootContainer, &mut wrapper);

    c.bench_function("alterations/info_report", |b| {
        b.iter(|| black_box(wrapper.info_report(0, &NoCatalog)));
    });
}

fn bench_rule_lookup(c: &mut Criterion) {
    let registry = make_registry();
    c.bench_function("alterations/rules_for_cached", |b| {
        b.iter(|| black_box(registry.rules_for(black_box(TargetType::LootContainer)).len()));
    });
}

criterion_group!(benches, bench_simulated_update, bench_report, bench_rule_lookup);
criterion_main!(benches);
