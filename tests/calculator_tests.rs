//! Tests for profit math.

use craftprofit::calculator::{
    profit, profit_per_second, ProfitConfig, ProfitSummary, DEFAULT_TAX_PERCENTAGE,
};
use craftprofit::error::CraftError;
use craftprofit::models::{ActionKind, ShoppingCartEntry};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn test_default_config() {
    let config = ProfitConfig::default();

    assert_eq!(config.tax_percentage, DEFAULT_TAX_PERCENTAGE);
    assert!(!config.value_pack_enabled);
}

#[test]
fn test_profit_with_tax() {
    let config = ProfitConfig::default();

    assert!(approx(profit(1000.0, 300.0, &config), 350.0));
}

#[test]
fn test_profit_with_value_pack() {
    let config = ProfitConfig {
        value_pack_enabled: true,
        ..ProfitConfig::default()
    };

    assert!(approx(profit(1000.0, 300.0, &config), 545.0));
}

#[test]
fn test_profit_can_be_negative() {
    let config = ProfitConfig::default();

    assert!(approx(profit(200.0, 200.0, &config), -70.0));
}

#[test]
fn test_profit_per_second_floors() {
    assert_eq!(profit_per_second(90.0, 5.0), Some(18.0));
    assert_eq!(profit_per_second(80.0, 3.0), Some(26.0));
    assert_eq!(profit_per_second(-10.0, 3.0), Some(-4.0));
}

#[test]
fn test_profit_per_second_undefined_without_time() {
    assert_eq!(profit_per_second(350.0, 0.0), None);
}

#[test]
fn test_validate_rejects_out_of_range_tax() {
    for tax in [-0.1, 1.5, f64::NAN] {
        let config = ProfitConfig {
            tax_percentage: tax,
            value_pack_enabled: false,
        };
        assert!(matches!(config.validate(), Err(CraftError::InvalidConfig(_))));
    }
    assert!(ProfitConfig::default().validate().is_ok());
}

#[test]
fn test_config_deserialize_defaults() {
    let config: ProfitConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, ProfitConfig::default());

    let config: ProfitConfig =
        serde_json::from_str(r#"{"tax_percentage": 0.9, "value_pack_enabled": true}"#).unwrap();
    assert_eq!(config.tax_percentage, 0.9);
    assert!(config.value_pack_enabled);
}

#[test]
fn test_summary_for_entry() {
    let entry = ShoppingCartEntry {
        for_parent: None,
        action: ActionKind::Craft,
        expected_count: 100,
        individual_price: 40.0,
        cumulative_time_spent: 5.0,
        craft_count: 100,
    };

    let summary = ProfitSummary::for_entry(200.0, &entry, &ProfitConfig::default());

    assert!(approx(summary.profit, 90.0));
    assert_eq!(summary.profit_per_second, Some(18.0));
    assert!(approx(summary.total_profit, 9000.0));
    assert!(approx(summary.total_spent, 4000.0));
    assert!(approx(summary.total_time, 500.0));
}

#[test]
fn test_summary_for_bought_entry() {
    let entry = ShoppingCartEntry {
        for_parent: Some("Plank".to_string()),
        action: ActionKind::Buy,
        expected_count: 200,
        individual_price: 25.0,
        cumulative_time_spent: 0.0,
        craft_count: 0,
    };

    let summary = ProfitSummary::for_entry(25.0, &entry, &ProfitConfig::default());

    assert_eq!(summary.profit_per_second, None);
    assert_eq!(summary.total_time, 0.0);
    assert!(approx(summary.total_spent, 5000.0));
}
