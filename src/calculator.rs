//! Profit calculations.
//!
//! All functions are pure given a [`ProfitConfig`]. The config is passed
//! explicitly to every call; changing it invalidates every action computed
//! with the previous value.

use serde::Deserialize;

use crate::error::{CraftError, Result};
use crate::models::ShoppingCartEntry;

/// Share of the market price kept after the selling tax.
pub const DEFAULT_TAX_PERCENTAGE: f64 = 0.65;

/// Extra selling price multiplier granted by the value pack.
pub const VALUE_PACK_MULTIPLIER: f64 = 1.3;

/// Selling-side tunables.
///
/// # Example
///
/// ```
/// use craftprofit::calculator::{profit, ProfitConfig};
///
/// let config = ProfitConfig::default();
/// assert!((profit(1000.0, 300.0, &config) - 350.0).abs() < 1e-9);
///
/// let with_pack = ProfitConfig { value_pack_enabled: true, ..config };
/// assert!((profit(1000.0, 300.0, &with_pack) - 545.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ProfitConfig {
    /// Multiplies the market price to get the realized selling price (0..=1)
    #[serde(default = "default_tax_percentage")]
    pub tax_percentage: f64,
    #[serde(default)]
    pub value_pack_enabled: bool,
}

fn default_tax_percentage() -> f64 {
    DEFAULT_TAX_PERCENTAGE
}

impl Default for ProfitConfig {
    fn default() -> Self {
        ProfitConfig {
            tax_percentage: DEFAULT_TAX_PERCENTAGE,
            value_pack_enabled: false,
        }
    }
}

impl ProfitConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.tax_percentage.is_finite() || !(0.0..=1.0).contains(&self.tax_percentage) {
            return Err(CraftError::InvalidConfig(format!(
                "tax percentage must be within 0..=1, got {}",
                self.tax_percentage
            )));
        }
        Ok(())
    }

    /// Price actually received for one unit sold at `market_price`.
    pub fn selling_price(&self, market_price: f64) -> f64 {
        let price = market_price * self.tax_percentage;
        if self.value_pack_enabled {
            price * VALUE_PACK_MULTIPLIER
        } else {
            price
        }
    }
}

/// Profit from selling one unit acquired for `acquisition_cost`.
pub fn profit(market_price: f64, acquisition_cost: f64, config: &ProfitConfig) -> f64 {
    config.selling_price(market_price) - acquisition_cost
}

/// Whole currency units of profit per second spent.
///
/// Returns `None`, the undefined rate, when no time is spent.
pub fn profit_per_second(profit: f64, time_spent: f64) -> Option<f64> {
    if time_spent == 0.0 {
        return None;
    }
    Some((profit / time_spent).floor())
}

/// Profit figures for one shopping cart entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfitSummary {
    /// Profit per unit
    pub profit: f64,
    pub profit_per_second: Option<f64>,
    /// `profit` times the expected count
    pub total_profit: f64,
    /// Currency spent to acquire every expected unit
    pub total_spent: f64,
    /// Seconds spent crafting every expected unit
    pub total_time: f64,
}

impl ProfitSummary {
    pub fn for_entry(market_price: f64, entry: &ShoppingCartEntry, config: &ProfitConfig) -> Self {
        let unit_profit = profit(market_price, entry.individual_price, config);
        let count = entry.expected_count as f64;
        ProfitSummary {
            profit: unit_profit,
            profit_per_second: profit_per_second(unit_profit, entry.cumulative_time_spent),
            total_profit: unit_profit * count,
            total_spent: entry.individual_price * count,
            total_time: entry.cumulative_time_spent * count,
        }
    }
}
