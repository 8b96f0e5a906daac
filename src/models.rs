//! Data models and structures for craftprofit.
//!
//! This module contains the core data structures used throughout the crate:
//! items and the recipes that produce them, the optimizer's Buy/Craft actions,
//! shopping cart entries, and the raw records supplied by the data-fetch layer.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{CraftError, Result};

/// A good that can be bought on the market and possibly crafted.
///
/// # Example
///
/// ```
/// use craftprofit::models::{Ingredient, Item, Recipe};
///
/// let mut plank = Item::new("Plank", 200.0);
/// plank.add_recipe(Recipe {
///     id: "r1".to_string(),
///     produced_item_name: "Plank".to_string(),
///     ingredients: vec![Ingredient::new("Log", 2.0)],
///     quantity_produced: Some(1.0),
///     time_to_produce: Some(2.0),
/// });
///
/// assert!(plank.recipe("r1").is_some());
/// assert_eq!(plank.craftable_recipes().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Unique name within one product query
    pub name: String,
    /// Price one unit sells for on the market
    pub market_price: f64,
    /// Every recipe producing this item, in declaration order
    pub recipes: Vec<Recipe>,
    /// Display ordering hint, `-1` when the record carries none
    pub depth: i32,
}

impl Item {
    pub fn new(name: impl Into<String>, market_price: f64) -> Self {
        Item {
            name: name.into(),
            market_price,
            recipes: Vec::new(),
            depth: -1,
        }
    }

    /// Adds a recipe unless one with the same id is already known.
    ///
    /// Returns `true` when the recipe was added.
    pub fn add_recipe(&mut self, recipe: Recipe) -> bool {
        if self.recipe(&recipe.id).is_some() {
            return false;
        }
        self.recipes.push(recipe);
        true
    }

    /// Replaces the recipe with the same id in place, or adds it.
    pub fn replace_recipe(&mut self, recipe: Recipe) {
        match self.recipes.iter_mut().find(|r| r.id == recipe.id) {
            Some(existing) => *existing = recipe,
            None => self.recipes.push(recipe),
        }
    }

    pub fn recipe(&self, recipe_id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == recipe_id)
    }

    /// Recipes eligible for crafting, in declaration order.
    pub fn craftable_recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter().filter(|r| r.is_craftable())
    }

    /// Looks up a recipe that can actually be crafted.
    pub fn craftable_recipe(&self, recipe_id: &str) -> Result<&Recipe> {
        let recipe = self.recipe(recipe_id).ok_or_else(|| CraftError::UnknownRecipe {
            item: self.name.clone(),
            recipe_id: recipe_id.to_string(),
        })?;
        if !recipe.is_craftable() {
            return Err(CraftError::RecipeNotCraftable {
                item: self.name.clone(),
                recipe_id: recipe_id.to_string(),
            });
        }
        Ok(recipe)
    }
}

/// One way of producing an item.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub produced_item_name: String,
    /// Ingredients consumed per craft
    pub ingredients: Vec<Ingredient>,
    /// Units yielded per craft. `None` marks a buy-only listing.
    pub quantity_produced: Option<f64>,
    /// Seconds per craft
    pub time_to_produce: Option<f64>,
}

impl Recipe {
    /// A recipe is a craft candidate only when it yields a positive quantity.
    pub fn is_craftable(&self) -> bool {
        matches!(self.quantity_produced, Some(q) if q > 0.0)
    }

    /// Units per craft, `1.0` for buy-only listings.
    pub fn yield_per_craft(&self) -> f64 {
        match self.quantity_produced {
            Some(q) if q > 0.0 => q,
            _ => 1.0,
        }
    }

    pub fn craft_time(&self) -> f64 {
        self.time_to_produce.unwrap_or(0.0)
    }
}

/// An ingredient edge of a recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub item_name: String,
    pub amount_per_craft: f64,
}

impl Ingredient {
    pub fn new(item_name: impl Into<String>, amount_per_craft: f64) -> Self {
        Ingredient {
            item_name: item_name.into(),
            amount_per_craft,
        }
    }
}

/// Back-reference from an item to a recipe in the active tree that consumes it.
///
/// The root item carries a single use with no parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUse {
    pub action_taken: ActionKind,
    pub parent_name: Option<String>,
    pub parent_recipe_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Buy,
    Craft,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Buy => "Buy",
            ActionKind::Craft => "Craft",
        }
    }
}

/// The optimizer's verdict for one item under one action set.
///
/// Costs and times are per unit of the item.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    /// Present iff `kind` is [`ActionKind::Craft`]
    pub recipe_id: Option<String>,
    pub monetary_cost: f64,
    pub time_per_unit: f64,
    pub resulting_profit: f64,
}

/// Both candidate actions for one item inside an [`ActionSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct ItemActions {
    pub buy: Action,
    pub craft: Option<Action>,
    /// The action the cascade follows for this item
    pub preferred: ActionKind,
}

impl ItemActions {
    pub fn preferred_action(&self) -> &Action {
        match (self.preferred, &self.craft) {
            (ActionKind::Craft, Some(craft)) => craft,
            _ => &self.buy,
        }
    }
}

/// Complete assignment of actions to every item reachable from one root recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSet {
    pub root_item: String,
    pub root_recipe_id: String,
    pub actions: BTreeMap<String, ItemActions>,
}

impl ActionSet {
    pub fn get(&self, item_name: &str) -> Option<&ItemActions> {
        self.actions.get(item_name)
    }

    /// The action the cascade should follow for `item_name`.
    pub fn preferred(&self, item_name: &str) -> Result<&Action> {
        self.actions
            .get(item_name)
            .map(ItemActions::preferred_action)
            .ok_or_else(|| CraftError::NoEligibleAction(item_name.to_string()))
    }

    /// The fixed Craft action at the root.
    pub fn root_craft(&self) -> Result<&Action> {
        self.actions
            .get(&self.root_item)
            .and_then(|a| a.craft.as_ref())
            .ok_or_else(|| CraftError::NoEligibleAction(self.root_item.clone()))
    }

    /// Replaces this set's entries with every entry of `other`.
    pub fn merge(&mut self, other: ActionSet) {
        self.actions.extend(other.actions);
    }
}

/// Quantity, price and time needed for one item in one "used-by" context.
///
/// Prices and times are per unit; multiply by `expected_count` for totals.
#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingCartEntry {
    /// Consuming item, `None` for the root
    pub for_parent: Option<String>,
    pub action: ActionKind,
    /// Units needed in this context
    pub expected_count: u64,
    pub individual_price: f64,
    pub cumulative_time_spent: f64,
    /// Crafts needed to yield `expected_count`, zero when bought
    pub craft_count: u64,
}

// ============================================================================
// Raw Record Structures
// ============================================================================

/// Market block of a raw record.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MarketData {
    #[serde(rename = "Market Price")]
    pub market_price: Option<f64>,
}

/// One recipe entry as delivered by the data-fetch layer.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RecipeRecord {
    /// Recipe id
    #[serde(rename = "_id")]
    pub id: Option<String>,
    /// Produced item name
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Market Data")]
    pub market_data: Option<MarketData>,
    #[serde(rename = "Ingredients", default)]
    pub ingredients: Vec<IngredientRecord>,
    #[serde(rename = "Quantity Produced")]
    pub quantity_produced: Option<f64>,
    #[serde(rename = "Time to Produce")]
    pub time_to_produce: Option<f64>,
    #[serde(default)]
    pub depth: Option<i32>,
}

impl RecipeRecord {
    pub fn market_price(&self) -> Option<f64> {
        self.market_data.as_ref().and_then(|m| m.market_price)
    }
}

/// One ingredient entry inside a [`RecipeRecord`].
///
/// Entries carrying market data also define the ingredient item; entries
/// without it only reference an item defined elsewhere.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct IngredientRecord {
    #[serde(rename = "Item Name")]
    pub item_name: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Amount")]
    pub amount: Option<f64>,
    #[serde(rename = "Market Data")]
    pub market_data: Option<MarketData>,
    /// Recipe id when the entry also lists a way to produce the ingredient
    #[serde(rename = "_id")]
    pub id: Option<String>,
    #[serde(rename = "Quantity Produced")]
    pub quantity_produced: Option<f64>,
    #[serde(rename = "Time to Produce")]
    pub time_to_produce: Option<f64>,
    #[serde(default)]
    pub depth: Option<i32>,
}

impl IngredientRecord {
    /// `Item Name`, falling back to `Name`.
    pub fn name(&self) -> Option<&str> {
        self.item_name.as_deref().or(self.name.as_deref())
    }

    pub fn market_price(&self) -> Option<f64> {
        self.market_data.as_ref().and_then(|m| m.market_price)
    }
}
