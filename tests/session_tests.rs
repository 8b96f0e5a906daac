//! Tests for recipe selection and the active-tree cascade.

use craftprofit::calculator::ProfitConfig;
use craftprofit::data::{load_records, parse_records};
use craftprofit::error::CraftError;
use craftprofit::graph::ItemGraph;
use craftprofit::models::{ActionKind, ItemUse};
use craftprofit::session::{build_active_tree, Session};
use std::path::Path;

fn fixture_session() -> Session {
    let records = load_records(Path::new("tests/fixtures/recipes.json"))
        .expect("Failed to load fixture");
    Session::from_records(&records, "Table", ProfitConfig::default())
        .expect("Failed to start session")
}

fn in_tree(session: &Session, name: &str) -> bool {
    session
        .graph()
        .id(name)
        .is_some_and(|id| session.active_tree().contains(id))
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn test_new_session_applies_optimal_recipe() {
    let session = fixture_session();

    assert_eq!(session.root_item(), "Table");
    assert_eq!(session.craft_count(), 100);
    assert_eq!(session.action_sets().len(), 2);
    assert_eq!(session.governing_actions().root_recipe_id, "t2");
    assert_eq!(session.active_recipe_id("Table"), Some("t2"));
    assert_eq!(session.active_recipe_id("Plank"), Some("p1"));
    assert_eq!(session.active_recipe_id("Log"), Some("l1"));
    assert_eq!(session.active_recipe_id("Tree"), None);

    assert!(in_tree(&session, "Tree"));
    assert!(!in_tree(&session, "Sawdust"));
}

#[test]
fn test_used_in_back_references() {
    let session = fixture_session();

    assert_eq!(
        session.used_in("Table"),
        &[ItemUse {
            action_taken: ActionKind::Craft,
            parent_name: None,
            parent_recipe_id: None,
        }]
    );
    assert_eq!(
        session.used_in("Log"),
        &[ItemUse {
            action_taken: ActionKind::Craft,
            parent_name: Some("Plank".to_string()),
            parent_recipe_id: Some("p1".to_string()),
        }]
    );
    assert_eq!(session.used_in("Tree")[0].action_taken, ActionKind::Buy);
    assert!(session.used_in("Sawdust").is_empty());
}

#[test]
fn test_select_root_recipe_resets_tree() {
    let mut session = fixture_session();

    session.select_recipe("Table", "t1").unwrap();

    assert_eq!(session.active_recipe_id("Table"), Some("t1"));
    let nail_parents: Vec<Option<&str>> = session
        .used_in("Nail")
        .iter()
        .map(|u| u.parent_name.as_deref())
        .collect();
    assert_eq!(nail_parents.len(), 2);
    assert!(nail_parents.contains(&Some("Table")));
    assert!(nail_parents.contains(&Some("Plank")));
    assert_eq!(session.cart().entries_for("Nail").len(), 2);

    session.select_recipe("Table", "t2").unwrap();

    assert_eq!(session.used_in("Nail").len(), 1);
    assert_eq!(session.used_in("Nail")[0].parent_name.as_deref(), Some("Plank"));
    assert_eq!(session.cart().entries_for("Nail").len(), 1);
    assert!(session.cart().entry_for("Nail", Some("Table")).is_none());
}

#[test]
fn test_reset_is_complete() {
    let fresh = fixture_session();
    let mut session = fixture_session();

    session.select_recipe("Plank", "p2").unwrap();
    session.select_buy("Sawdust").unwrap();
    session.reset_to_optimal().unwrap();

    assert_eq!(session.active_tree(), fresh.active_tree());
    assert_eq!(session.cart(), fresh.cart());
    assert_eq!(session.governing_actions(), fresh.governing_actions());
}

#[test]
fn test_selection_is_idempotent() {
    let mut session = fixture_session();

    session.select_recipe("Plank", "p2").unwrap();
    let tree = session.active_tree().clone();
    let cart = session.cart().clone();

    session.select_recipe("Plank", "p2").unwrap();

    assert_eq!(session.active_tree(), &tree);
    assert_eq!(session.cart(), &cart);
}

#[test]
fn test_non_root_override_recomputes_subtree() {
    let mut session = fixture_session();

    session.select_recipe("Plank", "p2").unwrap();

    assert_eq!(session.active_recipe_id("Table"), Some("t2"));
    assert_eq!(session.active_recipe_id("Plank"), Some("p2"));
    assert!(in_tree(&session, "Sawdust"));
    for gone in ["Log", "Tree", "Nail"] {
        assert!(!in_tree(&session, gone), "{} should leave the tree", gone);
        assert!(!session.cart().contains(gone));
    }

    assert_eq!(
        session.cart().entry_for("Sawdust", Some("Plank")).unwrap().expected_count,
        2000
    );
    let table = session.cart().root_entry().unwrap();
    assert!(approx(table.individual_price, 200.0));
    assert!(approx(table.cumulative_time_spent, 29.0));
}

#[test]
fn test_override_back_restores_subtree() {
    let mut session = fixture_session();

    session.select_recipe("Plank", "p2").unwrap();
    session.select_recipe("Plank", "p1").unwrap();

    assert!(in_tree(&session, "Log"));
    assert!(in_tree(&session, "Tree"));
    assert!(!in_tree(&session, "Sawdust"));
    assert_eq!(session.active_recipe_id("Log"), Some("l1"));
}

#[test]
fn test_select_buy_prunes_subtree() {
    let mut session = fixture_session();

    session.select_buy("Log").unwrap();

    assert_eq!(session.active_recipe_id("Log"), None);
    assert_eq!(session.used_in("Log")[0].action_taken, ActionKind::Buy);
    assert!(!in_tree(&session, "Tree"));

    let log = session.cart().entry_for("Log", Some("Plank")).unwrap();
    assert_eq!(log.action, ActionKind::Buy);
    assert_eq!(log.expected_count, 1000);
    assert_eq!(log.craft_count, 0);
    assert!(approx(session.cart().root_entry().unwrap().individual_price, 260.0));
}

#[test]
fn test_select_buy_rejects_root() {
    let mut session = fixture_session();

    let err = session.select_buy("Table").unwrap_err();
    assert!(matches!(err, CraftError::InvalidSelection { .. }));
    assert_eq!(session.active_recipe_id("Table"), Some("t2"));
}

#[test]
fn test_selection_outside_active_tree_is_rejected() {
    let mut session = fixture_session();
    let before = session.active_tree().clone();

    assert!(matches!(
        session.select_buy("Sawdust"),
        Err(CraftError::InvalidSelection { .. })
    ));
    assert!(matches!(
        session.select_buy("Chair"),
        Err(CraftError::UnknownItemReference { .. })
    ));
    assert!(matches!(
        session.select_recipe("Plank", "p9"),
        Err(CraftError::UnknownRecipe { .. })
    ));
    assert_eq!(session.active_tree(), &before);
}

#[test]
fn test_set_craft_count_only_rescales_cart() {
    let mut session = fixture_session();
    let tree = session.active_tree().clone();

    session.set_craft_count(10).unwrap();

    assert_eq!(session.craft_count(), 10);
    assert_eq!(session.active_tree(), &tree);
    assert_eq!(
        session.cart().entry_for("Plank", Some("Table")).unwrap().expected_count,
        50
    );
    assert!(matches!(
        session.set_craft_count(0),
        Err(CraftError::InvalidConfig(_))
    ));
    assert_eq!(session.craft_count(), 10);
}

#[test]
fn test_set_config_reoptimizes() {
    let mut session = fixture_session();
    session.select_recipe("Table", "t1").unwrap();

    session
        .set_config(ProfitConfig {
            value_pack_enabled: true,
            ..ProfitConfig::default()
        })
        .unwrap();

    assert!(session.config().value_pack_enabled);
    assert_eq!(session.active_recipe_id("Table"), Some("t2"));

    let err = session
        .set_config(ProfitConfig {
            tax_percentage: 2.0,
            value_pack_enabled: false,
        })
        .unwrap_err();
    assert!(matches!(err, CraftError::InvalidConfig(_)));
    assert!(session.config().value_pack_enabled);
}

#[test]
fn test_item_views_sorted_by_depth() {
    let session = fixture_session();

    let views = session.item_views();
    let names: Vec<&str> = views.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names.len(), 5);
    assert_eq!(names[0], "Table");
    assert_eq!(names[4], "Tree");
    assert!(views.windows(2).all(|w| w[0].depth <= w[1].depth));

    let plank = views.iter().find(|v| v.name == "Plank").unwrap();
    assert_eq!(plank.recipe_ids, vec!["p1", "p2"]);
    let log_row = plank.ingredients.iter().find(|r| r.item_name == "Log").unwrap();
    assert!(approx(log_row.total_needed, 1000.0));
    assert_eq!(plank.shopping_cart.len(), 1);
    assert!(approx(plank.shopping_cart[0].profit.profit, 123.0));
}

#[test]
fn test_cyclic_tree_keeps_root_recipe() {
    let records = parse_records(
        r#"[{"_id": "a1", "Name": "A", "Market Data": {"Market Price": 100},
             "Ingredients": [{"Item Name": "B", "Amount": 1, "Market Data": {"Market Price": 500}}],
             "Quantity Produced": 1, "Time to Produce": 1},
            {"_id": "b1", "Name": "B", "Market Data": {"Market Price": 500},
             "Ingredients": [{"Item Name": "A", "Amount": 1}],
             "Quantity Produced": 1, "Time to Produce": 1}]"#,
    )
    .unwrap();
    let graph = ItemGraph::from_records(&records).unwrap();
    let session = Session::new(graph, "A", ProfitConfig::default(), 10).unwrap();

    assert_eq!(session.active_recipe_id("A"), Some("a1"));
    assert_eq!(session.active_recipe_id("B"), Some("b1"));
    assert_eq!(session.used_in("A").len(), 2);

    let rebuilt = build_active_tree(session.graph(), session.governing_actions()).unwrap();
    assert_eq!(&rebuilt, session.active_tree());
}

#[test]
fn test_zero_craft_count_session_rejected() {
    let records = load_records(Path::new("tests/fixtures/recipes.json")).unwrap();
    let graph = ItemGraph::from_records(&records).unwrap();

    let err = Session::new(graph, "Table", ProfitConfig::default(), 0).unwrap_err();
    assert!(matches!(err, CraftError::InvalidConfig(_)));
}

#[test]
fn test_cyclic_override_keeps_root_crafted() {
    let records = parse_records(
        r#"[{"_id": "a1", "Name": "A", "Market Data": {"Market Price": 100},
             "Ingredients": [{"Item Name": "B", "Amount": 1, "Market Data": {"Market Price": 500}}],
             "Quantity Produced": 1, "Time to Produce": 1},
            {"_id": "b1", "Name": "B", "Market Data": {"Market Price": 500},
             "Ingredients": [{"Item Name": "A", "Amount": 1}],
             "Quantity Produced": 1, "Time to Produce": 1}]"#,
    )
    .unwrap();
    let graph = ItemGraph::from_records(&records).unwrap();
    let mut session = Session::new(graph, "A", ProfitConfig::default(), 10).unwrap();

    session.select_recipe("B", "b1").unwrap();

    assert_eq!(session.active_recipe_id("A"), Some("a1"));
    assert_eq!(session.active_recipe_id("B"), Some("b1"));
    assert_eq!(session.governing_actions().preferred("A").unwrap().kind, ActionKind::Craft);
    assert_eq!(
        session.used_in("B"),
        &[ItemUse {
            action_taken: ActionKind::Craft,
            parent_name: Some("A".to_string()),
            parent_recipe_id: Some("a1".to_string()),
        }]
    );
    assert_eq!(
        session.cart().entry_for("A", Some("B")).unwrap().action,
        ActionKind::Buy
    );
}

#[test]
fn test_governing_root_cost_follows_override() {
    let mut session = fixture_session();

    session.select_recipe("Plank", "p2").unwrap();

    let root = session.governing_actions().root_craft().unwrap();
    assert!(approx(root.monetary_cost, 200.0));
    assert!(approx(root.time_per_unit, 29.0));
    assert!(approx(root.resulting_profit, 450.0));
}
