use std::sync::Arc;

use droptables::serialization::rules_from_json;
use droptables::{
    BasicItemDrop, DropTableDef, DropableWrapper, DropsConfig, DropsPatcher, HolderIdentity,
    InMemoryDropTables, InMemoryDropable, ItemDropChance, ItemGenerator, ItemId, NoCatalog,
    TableChanceDrop, TableDrop, TargetType,
};

const RULES: &str = r#"[
    {
        "uid": "pack.merchant",
        "target_type": "Merchant",
        "matcher": {"type": "any"},
        "alterations": [
            {"type": "add_guaranteed_drops", "drops": [{"item_id": 500, "min_drop_count": 2}]},
            {"type": "remove_chance_drops", "items_to_remove": [1]},
            {"type": "additional_drop_tables_by_uid", "uids": ["t.bonus"]}
        ]
    }
]"#;

fn shop() -> InMemoryDropable {
    InMemoryDropable::new(HolderIdentity::named("Shop").with_uid("inv-7"))
        .with_guaranteed(ItemGenerator::named("Stock", vec![BasicItemDrop::new(100, 1, 1)]))
        .with_chance(ItemGenerator::named(
            "Rare",
            vec![ItemDropChance::new(1, 1, 1, 10), ItemDropChance::new(2, 1, 1, 10)],
        ))
}

fn tables() -> InMemoryDropTables {
    [DropTableDef::new("t.bonus")
        .with_guaranteed(TableDrop::new(700, 1, 1))
        .with_random(vec![TableChanceDrop::new(701, 1, 1, 3)])]
    .into_iter()
    .collect()
}

#[test]
fn simulated_wrapper_never_touches_live_state() {
    let tables = tables();
    let mut registry = droptables::AlterationRegistry::new();
    registry.load(rules_from_json(RULES).unwrap(), &tables);

    let shop = shop();
    let before = shop.clone();

    let mut wrapper = DropableWrapper::simulated(&shop);
    assert!(registry.try_update(TargetType::Merchant, &mut wrapper));
    assert_eq!(registry.add_additional_droppers_to(TargetType::Merchant, &mut wrapper, &tables), 2);

    assert!(wrapper.has_changes());
    assert!(wrapper.guaranteed_droppers()[0].contains(ItemId(500)));
    assert!(!wrapper.chance_droppers()[0].contains(ItemId(1)));
    assert_eq!(wrapper.guaranteed_droppers().len(), 2);
    assert_eq!(wrapper.chance_droppers().len(), 2);

    let report = wrapper.info_report(0, &NoCatalog);
    assert!(report.starts_with("Dropable: Shop (altered):\n"));
    assert!(report.contains("GuaranteedDrop 1: SL_DropTable - t.bonus (additional)"));
    assert!(report.contains("DropTable 1: SL_DropTable Random 0 - t.bonus (additional)"));
    assert!(report.contains("- x2      <unknown> (500)"));

    drop(wrapper);
    assert_eq!(shop, before);
    assert_eq!(shop.chance[0].resets, 0);
}

#[test]
fn live_and_simulated_runs_agree() {
    let tables = tables();
    let mut registry = droptables::AlterationRegistry::new();
    registry.load(rules_from_json(RULES).unwrap(), &tables);

    let shop_sim = shop();
    let mut simulated = DropableWrapper::simulated(&shop_sim);
    registry.try_update(TargetType::Merchant, &mut simulated);
    let simulated_guaranteed = simulated.guaranteed_droppers()[0].drops().to_vec();
    let simulated_chance = simulated.chance_droppers()[0].drops().to_vec();

    let mut shop_live = shop();
    let mut live = DropableWrapper::live(&mut shop_live);
    registry.try_update(TargetType::Merchant, &mut live);
    drop(live);

    assert_eq!(shop_live.guaranteed[0].drops, simulated_guaranteed);
    assert_eq!(shop_live.chance[0].drops, simulated_chance);
    assert_eq!(shop_live.chance[0].resets, 1);
}

#[test]
fn merchant_dry_run_leaves_scene_state_alone() {
    let mut patcher = DropsPatcher::new(DropsConfig::default(), Arc::new(tables()));
    patcher.load_rules(rules_from_json(RULES).unwrap());

    let shops = vec![shop()];
    let reports = patcher.simulate_merchants(&shops);
    assert_eq!(reports.len(), 1);
    assert!(reports[0].starts_with("Would update droptables for a merchant Shop (UID=inv-7):"));
    assert!(!patcher.is_merchant_updated("inv-7"));
    assert_eq!(shops[0], shop());

    let mut live = shop();
    assert!(patcher.patch_merchant(&mut live));
    assert!(patcher.is_merchant_updated("inv-7"));
    assert!(live.guaranteed[0].drops.iter().any(|d| d.item_id == ItemId(500)));
    // Additional drops are rolled separately, never appended to the live inventory.
    assert_eq!(live.guaranteed.len(), 1);
}
