//! WebAssembly bindings for craftprofit.
//!
//! This module provides JavaScript-accessible functions for the optimizer.
//! Input and output are JSON strings so the functions also run natively.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::calculator::{profit, ProfitConfig};
use crate::cart::DEFAULT_CRAFT_COUNT;
use crate::data::sort_ingredients_by_price;
use crate::display::format_time;
use crate::error::Result;
use crate::graph::ItemGraph;
use crate::models::RecipeRecord;
use crate::session::{CartLine, ItemView, Session};

fn default_craft_count() -> u32 {
    DEFAULT_CRAFT_COUNT
}

/// A manual choice replayed after the optimal selection.
#[derive(Debug, Clone, Deserialize)]
pub struct JsChoice {
    pub item: String,
    /// `null` buys the item
    #[serde(default)]
    pub recipe_id: Option<String>,
}

/// JavaScript-friendly input for optimization.
#[derive(Debug, Clone, Deserialize)]
pub struct JsOptimizeInput {
    pub records: Vec<RecipeRecord>,
    /// Root item to optimize
    pub item: String,
    #[serde(default = "default_craft_count")]
    pub craft_count: u32,
    #[serde(flatten)]
    pub config: ProfitConfig,
    #[serde(default)]
    pub choices: Vec<JsChoice>,
}

/// JavaScript-friendly back-reference.
#[derive(Debug, Clone, Serialize)]
pub struct JsItemUse {
    pub action_taken: String,
    pub parent_name: Option<String>,
    pub parent_recipe_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsIngredientRow {
    pub item_name: String,
    pub amount_per_craft: f64,
    pub total_needed: f64,
}

/// JavaScript-friendly cart entry with its profit badges.
#[derive(Debug, Clone, Serialize)]
pub struct JsCartEntry {
    pub for_parent: Option<String>,
    pub action: String,
    pub expected_count: u64,
    pub individual_price: f64,
    pub cumulative_time_spent: f64,
    pub craft_count: u64,
    pub profit: f64,
    pub profit_per_second: Option<f64>,
    pub total_profit: f64,
    pub total_spent: f64,
    pub total_time: f64,
    pub total_time_formatted: String,
}

/// JavaScript-friendly item output.
#[derive(Debug, Clone, Serialize)]
pub struct JsItemView {
    pub name: String,
    pub market_price: f64,
    pub depth: i32,
    pub recipes: Vec<String>,
    pub active_recipe_id: Option<String>,
    pub used_in_recipes: Vec<JsItemUse>,
    pub ingredients: Vec<JsIngredientRow>,
    pub shopping_cart_entries: Vec<JsCartEntry>,
}

/// Profit of one candidate root recipe.
#[derive(Debug, Clone, Serialize)]
pub struct JsRootRecipe {
    pub recipe_id: String,
    pub cost: f64,
    pub profit: f64,
}

/// JavaScript-friendly optimization result.
#[derive(Debug, Clone, Serialize)]
pub struct JsOptimizeResult {
    pub success: bool,
    pub error: Option<String>,
    pub root_item: String,
    pub craft_count: u32,
    pub active_recipe_id: Option<String>,
    pub root_recipes: Vec<JsRootRecipe>,
    pub items: Vec<JsItemView>,
}

impl JsOptimizeResult {
    fn failure(root_item: String, craft_count: u32, error: String) -> Self {
        JsOptimizeResult {
            success: false,
            error: Some(error),
            root_item,
            craft_count,
            active_recipe_id: None,
            root_recipes: vec![],
            items: vec![],
        }
    }
}

impl From<&CartLine> for JsCartEntry {
    fn from(line: &CartLine) -> Self {
        JsCartEntry {
            for_parent: line.entry.for_parent.clone(),
            action: line.entry.action.as_str().to_string(),
            expected_count: line.entry.expected_count,
            individual_price: line.entry.individual_price,
            cumulative_time_spent: line.entry.cumulative_time_spent,
            craft_count: line.entry.craft_count,
            profit: line.profit.profit,
            profit_per_second: line.profit.profit_per_second,
            total_profit: line.profit.total_profit,
            total_spent: line.profit.total_spent,
            total_time: line.profit.total_time,
            total_time_formatted: format_time(line.profit.total_time),
        }
    }
}

impl From<&ItemView> for JsItemView {
    fn from(view: &ItemView) -> Self {
        JsItemView {
            name: view.name.clone(),
            market_price: view.market_price,
            depth: view.depth,
            recipes: view.recipe_ids.clone(),
            active_recipe_id: view.active_recipe_id.clone(),
            used_in_recipes: view
                .used_in
                .iter()
                .map(|u| JsItemUse {
                    action_taken: u.action_taken.as_str().to_string(),
                    parent_name: u.parent_name.clone(),
                    parent_recipe_id: u.parent_recipe_id.clone(),
                })
                .collect(),
            ingredients: view
                .ingredients
                .iter()
                .map(|i| JsIngredientRow {
                    item_name: i.item_name.clone(),
                    amount_per_craft: i.amount_per_craft,
                    total_needed: i.total_needed,
                })
                .collect(),
            shopping_cart_entries: view.shopping_cart.iter().map(JsCartEntry::from).collect(),
        }
    }
}

/// Optimizes the requested root item and returns the active tree as JSON.
///
/// Errors never escape: they come back as `{"success": false, "error": ...}`.
#[wasm_bindgen]
pub fn optimize(input_json: &str) -> String {
    let input: JsOptimizeInput = match serde_json::from_str(input_json) {
        Ok(i) => i,
        Err(e) => {
            return serde_json::to_string(&JsOptimizeResult::failure(
                String::new(),
                DEFAULT_CRAFT_COUNT,
                format!("Invalid input: {}", e),
            ))
            .unwrap_or_default();
        }
    };

    let root_item = input.item.clone();
    let craft_count = input.craft_count;
    let result = run_optimization(input)
        .unwrap_or_else(|e| JsOptimizeResult::failure(root_item, craft_count, e.to_string()));
    serde_json::to_string(&result).unwrap_or_default()
}

fn run_optimization(input: JsOptimizeInput) -> Result<JsOptimizeResult> {
    let mut records = input.records;
    sort_ingredients_by_price(&mut records);

    let graph = ItemGraph::from_records(&records)?;
    let mut session = Session::new(graph, &input.item, input.config, input.craft_count)?;

    for choice in &input.choices {
        match choice.recipe_id {
            Some(ref recipe_id) => session.select_recipe(&choice.item, recipe_id)?,
            None => session.select_buy(&choice.item)?,
        }
    }

    let market_price = session.graph().item(&input.item, "optimizer")?.market_price;
    let mut root_recipes = Vec::with_capacity(session.action_sets().len());
    for set in session.action_sets().iter() {
        let cost = set.root_craft()?.monetary_cost;
        root_recipes.push(JsRootRecipe {
            recipe_id: set.root_recipe_id.clone(),
            cost,
            profit: profit(market_price, cost, session.config()),
        });
    }

    Ok(JsOptimizeResult {
        success: true,
        error: None,
        root_item: input.item.clone(),
        craft_count: session.craft_count(),
        active_recipe_id: session.active_recipe_id(&input.item).map(str::to_string),
        root_recipes,
        items: session.item_views().iter().map(JsItemView::from).collect(),
    })
}

/// Get the version of the optimizer.
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
