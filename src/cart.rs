//! Shopping cart aggregation along one action set.
//!
//! Walks the tree selected by an [`ActionSet`] from its root, scaling each
//! ingredient's amount by the quantity its parent needs, and records per-unit
//! price and crafting time for every item in every "used-by" context.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::calculator::ProfitConfig;
use crate::error::{CraftError, Result};
use crate::graph::ItemGraph;
use crate::models::{Action, ActionKind, ActionSet, ShoppingCartEntry};
use crate::optimizer::buy_action;

/// Root units produced when the caller does not say otherwise.
pub const DEFAULT_CRAFT_COUNT: u32 = 100;

/// Float noise tolerated before rounding a quantity up.
const COUNT_EPSILON: f64 = 1e-9;

/// Every cart entry of one active tree, grouped by item name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShoppingCart {
    pub root_item: String,
    pub craft_count: u32,
    entries: BTreeMap<String, Vec<ShoppingCartEntry>>,
}

impl ShoppingCart {
    /// Entries of `item_name`, one per consuming parent.
    pub fn entries_for(&self, item_name: &str) -> &[ShoppingCartEntry] {
        self.entries
            .get(item_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn entry_for(&self, item_name: &str, parent: Option<&str>) -> Option<&ShoppingCartEntry> {
        self.entries_for(item_name)
            .iter()
            .find(|e| e.for_parent.as_deref() == parent)
    }

    pub fn root_entry(&self) -> Option<&ShoppingCartEntry> {
        self.entry_for(&self.root_item, None)
    }

    pub fn contains(&self, item_name: &str) -> bool {
        self.entries.contains_key(item_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ShoppingCartEntry])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Items that must be bought, with the total units across all parents.
    pub fn purchases(&self) -> Vec<(&str, u64)> {
        self.entries
            .iter()
            .filter_map(|(name, entries)| {
                let bought: u64 = entries
                    .iter()
                    .filter(|e| e.action == ActionKind::Buy)
                    .map(|e| e.expected_count)
                    .sum();
                let any_bought = entries.iter().any(|e| e.action == ActionKind::Buy);
                any_bought.then_some((name.as_str(), bought))
            })
            .collect()
    }

    /// Adds `entry`, merging it into an earlier entry for the same parent.
    /// `yield_per_craft` converts the merged count back into crafts.
    fn record(&mut self, item_name: &str, entry: ShoppingCartEntry, yield_per_craft: f64) {
        let entries = self.entries.entry(item_name.to_string()).or_default();
        match entries.iter_mut().find(|e| e.for_parent == entry.for_parent) {
            Some(existing) => {
                existing.expected_count += entry.expected_count;
                if existing.action == ActionKind::Craft {
                    existing.craft_count =
                        ceil_units(existing.expected_count as f64 / yield_per_craft);
                }
            }
            None => entries.push(entry),
        }
    }
}

struct CartWalk<'a> {
    graph: &'a ItemGraph,
    actions: &'a ActionSet,
    config: &'a ProfitConfig,
    stack: HashSet<String>,
    cart: ShoppingCart,
}

/// Computes the shopping cart for producing `craft_count` units of the action
/// set's root item.
///
/// Items needed in zero quantity are still recorded, with zero cost.
///
/// # Example
///
/// ```
/// use craftprofit::calculator::ProfitConfig;
/// use craftprofit::cart::calculate_costs_with_action_set;
/// use craftprofit::data::parse_records;
/// use craftprofit::graph::ItemGraph;
/// use craftprofit::optimizer::find_optimal_action_sets;
///
/// let records = parse_records(r#"[
///     {"_id": "r1", "Name": "Plank", "Market Data": {"Market Price": 200},
///      "Ingredients": [{"Item Name": "Log", "Amount": 2, "Market Data": {"Market Price": 20}}],
///      "Quantity Produced": 1, "Time to Produce": 2}
/// ]"#).unwrap();
/// let graph = ItemGraph::from_records(&records).unwrap();
/// let config = ProfitConfig::default();
/// let sets = find_optimal_action_sets(&graph, "Plank", &config).unwrap();
///
/// let cart = calculate_costs_with_action_set(&graph, &sets.sets[0], 100, &config).unwrap();
/// assert_eq!(cart.entry_for("Log", Some("Plank")).unwrap().expected_count, 200);
/// ```
pub fn calculate_costs_with_action_set(
    graph: &ItemGraph,
    actions: &ActionSet,
    craft_count: u32,
    config: &ProfitConfig,
) -> Result<ShoppingCart> {
    if craft_count == 0 {
        return Err(CraftError::InvalidConfig(
            "craft count must be positive".to_string(),
        ));
    }

    let mut walk = CartWalk {
        graph,
        actions,
        config,
        stack: HashSet::new(),
        cart: ShoppingCart {
            root_item: actions.root_item.clone(),
            craft_count,
            entries: BTreeMap::new(),
        },
    };
    visit(&mut walk, &actions.root_item, None, u64::from(craft_count))?;
    debug!(
        root = %actions.root_item,
        craft_count,
        items = walk.cart.entries.len(),
        "computed shopping cart"
    );
    Ok(walk.cart)
}

/// Records `name`'s entry under `parent` and returns its per-unit price and time.
fn visit(
    walk: &mut CartWalk<'_>,
    name: &str,
    parent: Option<&str>,
    expected_count: u64,
) -> Result<(f64, f64)> {
    let graph = walk.graph;
    let item = graph.item(name, parent.unwrap_or("shopping cart"))?;
    let action = resolve_action(walk, name)?;

    let (kind, price, time, craft_count, yield_per_craft) = match (action.kind, action.recipe_id.as_deref()) {
        (ActionKind::Craft, Some(recipe_id)) => {
            let recipe = item.craftable_recipe(recipe_id)?;
            let quantity = recipe.yield_per_craft();

            walk.stack.insert(name.to_string());
            let mut cost = 0.0;
            let mut time = recipe.craft_time();
            for ingredient in &recipe.ingredients {
                let needed = ceil_units(
                    ingredient.amount_per_craft * expected_count as f64 / quantity,
                );
                let (unit_price, unit_time) =
                    visit(walk, &ingredient.item_name, Some(name), needed)?;
                cost += ingredient.amount_per_craft * unit_price;
                time += ingredient.amount_per_craft * unit_time;
            }
            walk.stack.remove(name);

            (
                ActionKind::Craft,
                cost / quantity,
                time / quantity,
                ceil_units(expected_count as f64 / quantity),
                quantity,
            )
        }
        _ => (ActionKind::Buy, item.market_price, 0.0, 0, 1.0),
    };

    walk.cart.record(
        name,
        ShoppingCartEntry {
            for_parent: parent.map(str::to_string),
            action: kind,
            expected_count,
            individual_price: price,
            cumulative_time_spent: time,
            craft_count,
        },
        yield_per_craft,
    );
    Ok((price, time))
}

/// The action to follow for `name`: Buy when it is already being crafted
/// higher up, or when the action set knows nothing about it.
fn resolve_action(walk: &CartWalk<'_>, name: &str) -> Result<Action> {
    let item = walk.graph.item(name, "shopping cart")?;
    if walk.stack.contains(name) {
        warn!(item = name, "crafting cycle, buying at cyclic point");
        return Ok(buy_action(item, walk.config));
    }
    match walk.actions.preferred(name) {
        Ok(action) => Ok(action.clone()),
        Err(CraftError::NoEligibleAction(_)) => {
            warn!(item = name, "no action known, treating as leaf");
            Ok(buy_action(item, walk.config))
        }
        Err(e) => Err(e),
    }
}

fn ceil_units(quantity: f64) -> u64 {
    (quantity - COUNT_EPSILON).ceil().max(0.0) as u64
}
