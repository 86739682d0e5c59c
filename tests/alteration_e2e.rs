use droptables::serialization::rules_from_json;
use droptables::{
    AddGuaranteedDrops, AlterationRegistry, AlterationRule, BasicItemDrop, ChanceDrop, Constraint,
    DropTableDef, DropableWrapper, DropperFilter, DropperMatcher, GuaranteedDrop, HolderIdentity,
    InMemoryDropTables, InMemoryDropable, ItemDropChance, ItemGenerator, ItemId, TableDrop,
    TargetType,
};

fn item_ids(drops: &[BasicItemDrop]) -> Vec<i32> {
    drops.iter().map(|d| d.item_id.0).collect()
}

fn two_pouches() -> InMemoryDropable {
    InMemoryDropable::new(HolderIdentity::named("Chest_Berg").in_scene("Berg"))
        .with_guaranteed(ItemGenerator::named("Pouch_A", vec![BasicItemDrop::new(1, 1, 1)]))
        .with_guaranteed(ItemGenerator::named("Pouch_B", vec![BasicItemDrop::new(2, 1, 1)]))
}

fn registry_with(rules: Vec<AlterationRule>, tables: &InMemoryDropTables) -> AlterationRegistry {
    let mut registry = AlterationRegistry::new();
    registry.load(rules, tables);
    registry
}

fn add_rule(filter: DropperFilter) -> AlterationRule {
    AlterationRule::new("pack.add", TargetType::LootContainer)
        .with_matcher(Constraint::any(vec![]))
        .with_alteration(droptables::Alteration::AddGuaranteedDrops(AddGuaranteedDrops::new(
            filter,
            vec![GuaranteedDrop::new(9, 1, 3)],
        )))
}

#[test]
fn first_match_only_mutates_one_container() {
    let tables = InMemoryDropTables::new();
    let registry = registry_with(vec![add_rule(DropperFilter::any())], &tables);

    let mut chest = two_pouches();
    let mut wrapper = DropableWrapper::live(&mut chest);
    assert!(registry.try_update(TargetType::LootContainer, &mut wrapper));
    drop(wrapper);

    assert_eq!(item_ids(&chest.guaranteed[0].drops), vec![1, 9]);
    assert_eq!(item_ids(&chest.guaranteed[1].drops), vec![2]);
}

#[test]
fn all_matches_mutates_every_container() {
    let tables = InMemoryDropTables::new();
    let registry =
        registry_with(vec![add_rule(DropperFilter::any().first_match_only(false))], &tables);

    let mut chest = two_pouches();
    let mut wrapper = DropableWrapper::live(&mut chest);
    assert!(registry.try_update(TargetType::LootContainer, &mut wrapper));
    drop(wrapper);

    assert_eq!(item_ids(&chest.guaranteed[0].drops), vec![1, 9]);
    assert_eq!(item_ids(&chest.guaranteed[1].drops), vec![2, 9]);
    assert_eq!(chest.guaranteed[1].drops[1], BasicItemDrop::new(9, 1, 3));
}

#[test]
fn generator_name_filter_selects_container() {
    let tables = InMemoryDropTables::new();
    let registry = registry_with(
        vec![add_rule(DropperFilter::matching(vec![DropperMatcher::contains("_B")]))],
        &tables,
    );

    let mut chest = two_pouches();
    let mut wrapper = DropableWrapper::live(&mut chest);
    assert!(registry.try_update(TargetType::LootContainer, &mut wrapper));
    drop(wrapper);

    assert_eq!(item_ids(&chest.guaranteed[0].drops), vec![1]);
    assert_eq!(item_ids(&chest.guaranteed[1].drops), vec![2, 9]);
}

#[test]
fn adding_twice_is_idempotent() {
    let tables = InMemoryDropTables::new();
    let registry = registry_with(vec![add_rule(DropperFilter::any())], &tables);

    let mut chest = two_pouches();
    assert!(registry.try_update(TargetType::LootContainer, &mut DropableWrapper::live(&mut chest)));
    let after_first = chest.clone();

    let mut wrapper = DropableWrapper::live(&mut chest);
    assert!(!registry.try_update(TargetType::LootContainer, &mut wrapper));
    assert!(!wrapper.has_changes());
    drop(wrapper);
    assert_eq!(chest, after_first);
}

#[test]
fn first_match_modify_moves_past_unchanged_container() {
    let json = r#"[{
        "uid": "pack.tune",
        "target_type": "LootContainer",
        "matcher": {"type": "any"},
        "alterations": [
            {"type": "modify_guaranteed_drops", "modified_drops": [
                {"item_id": 5, "min_drop_count": 2, "max_drop_count": 4}
            ]},
            {"type": "modify_chance_drops", "modified_drops": [
                {"item_id": 6, "min_drop_count": 1, "max_drop_count": 1, "drop_chance": 30}
            ]}
        ]
    }]"#;
    let tables = InMemoryDropTables::new();
    let registry = registry_with(rules_from_json(json).unwrap(), &tables);

    let mut chest = InMemoryDropable::new(HolderIdentity::named("Chest_Twin"))
        .with_guaranteed(ItemGenerator::named("Pouch_A", vec![BasicItemDrop::new(5, 2, 4)]))
        .with_guaranteed(ItemGenerator::named("Pouch_B", vec![BasicItemDrop::new(5, 1, 1)]))
        .with_chance(ItemGenerator::named("Loot_A", vec![ItemDropChance::new(6, 1, 1, 30)]))
        .with_chance(ItemGenerator::named("Loot_B", vec![ItemDropChance::new(6, 1, 1, 10)]));
    assert!(registry.try_update(TargetType::LootContainer, &mut DropableWrapper::live(&mut chest)));

    assert_eq!(chest.guaranteed[0].drops, vec![BasicItemDrop::new(5, 2, 4)]);
    assert_eq!(chest.guaranteed[1].drops, vec![BasicItemDrop::new(5, 2, 4)]);
    assert_eq!(chest.chance[0].resets, 0);
    assert_eq!(chest.chance[1].drops, vec![ItemDropChance::new(6, 1, 1, 30)]);

    // Every container already matches now, so a second pass changes nothing.
    let after_first = chest.clone();
    let mut wrapper = DropableWrapper::live(&mut chest);
    assert!(!registry.try_update(TargetType::LootContainer, &mut wrapper));
    drop(wrapper);
    assert_eq!(chest, after_first);
}

#[test]
fn removal_and_modification_from_json_rules() {
    let json = r#"[
        {
            "uid": "pack.trim",
            "target_type": "LootContainer",
            "matcher": {"type": "all", "constraints": [
                {"type": "scene", "scene": "Berg"},
                {"type": "dropable_name", "name": "Chest"}
            ]},
            "alterations": [
                {"type": "remove_guaranteed_drops", "items_to_remove": [3, 7]},
                {"type": "modify_guaranteed_drops", "modified_drops": [
                    {"item_id": 5, "min_drop_count": 2, "max_drop_count": 4}
                ]}
            ]
        }
    ]"#;
    let tables = InMemoryDropTables::new();
    let registry = registry_with(rules_from_json(json).unwrap(), &tables);

    let mut chest = InMemoryDropable::new(HolderIdentity::named("Chest_Big").in_scene("Berg"))
        .with_guaranteed(ItemGenerator::named(
            "Pouch",
            vec![
                BasicItemDrop::new(1, 1, 1),
                BasicItemDrop::new(3, 1, 1),
                BasicItemDrop::new(5, 1, 1),
                BasicItemDrop::new(7, 1, 1),
            ],
        ));
    assert!(registry.try_update(TargetType::LootContainer, &mut DropableWrapper::live(&mut chest)));
    assert_eq!(item_ids(&chest.guaranteed[0].drops), vec![1, 5]);
    assert_eq!(chest.guaranteed[0].drops[1], BasicItemDrop::new(5, 2, 4));

    // Same scene, different holder name: the All constraint rejects it.
    let mut barrel = InMemoryDropable::new(HolderIdentity::named("Barrel").in_scene("Berg"))
        .with_guaranteed(ItemGenerator::named("Pouch", vec![BasicItemDrop::new(3, 1, 1)]));
    let mut wrapper = DropableWrapper::live(&mut barrel);
    assert!(!registry.try_update(TargetType::LootContainer, &mut wrapper));
    drop(wrapper);
    assert_eq!(item_ids(&barrel.guaranteed[0].drops), vec![3]);
}

#[test]
fn removing_disjoint_items_reports_no_change() {
    let json = r#"[{
        "uid": "pack.none",
        "target_type": "EnemyOrMonster",
        "matcher": {"type": "any"},
        "alterations": [{"type": "remove_guaranteed_drops", "items_to_remove": [40, 41]}]
    }]"#;
    let tables = InMemoryDropTables::new();
    let registry = registry_with(rules_from_json(json).unwrap(), &tables);

    let mut corpse = two_pouches();
    let mut wrapper = DropableWrapper::live(&mut corpse);
    assert!(!registry.try_update(TargetType::EnemyOrMonster, &mut wrapper));
    assert!(!wrapper.has_changes());
}

#[test]
fn relative_chance_uses_average_weight() {
    let json = r#"[{
        "uid": "pack.rare",
        "target_type": "EnemyOrMonster",
        "matcher": {"type": "any"},
        "alterations": [{"type": "add_chance_drops", "drops": [
            {"type": "relative", "item_id": 99, "relative_chance": 0.5}
        ]}]
    }]"#;
    let tables = InMemoryDropTables::new();
    let registry = registry_with(rules_from_json(json).unwrap(), &tables);

    let mut wolf =
        InMemoryDropable::new(HolderIdentity::named("Wolf")).with_chance(ItemGenerator::named(
            "WolfLoot",
            vec![ItemDropChance::new(1, 1, 1, 5), ItemDropChance::new(2, 1, 1, 15)],
        ));
    assert!(registry.try_update(TargetType::EnemyOrMonster, &mut DropableWrapper::live(&mut wolf)));
    assert_eq!(wolf.chance[0].drops[2], ItemDropChance::new(99, 1, 1, 5));
    assert_eq!(wolf.chance[0].resets, 1);
    assert_eq!(ChanceDrop::relative(99, 1, 1, 0.5).resolve_chance(10.0), 5);
}

#[test]
fn drop_table_references_resolve_at_load() {
    let tables: InMemoryDropTables = [DropTableDef::new("t.ore")
        .with_guaranteed(TableDrop::new(10, 1, 2))
        .with_guaranteed(TableDrop::new(11, 1, 1))]
    .into_iter()
    .collect();
    let json = r#"[{
        "uid": "pack.ore",
        "target_type": "LootContainer",
        "matcher": {"type": "any"},
        "alterations": [{"type": "add_guaranteed_from_drop_table", "drop_table_uids": ["t.ore", "t.missing"]}]
    }]"#;
    let registry = registry_with(rules_from_json(json).unwrap(), &tables);
    let errors = registry.validate(&tables).unwrap();
    assert_eq!(
        errors,
        vec![
            "pack.ore: Alterations[0]: Unable to find drop table with UID 't.missing'!".to_string()
        ]
    );

    let mut chest = two_pouches();
    let mut wrapper = DropableWrapper::live(&mut chest);
    assert!(registry.try_update(TargetType::LootContainer, &mut wrapper));
    assert!(wrapper.guaranteed_droppers()[0].contains(ItemId(10)));
    assert!(wrapper.guaranteed_droppers()[0].contains(ItemId(11)));
}
