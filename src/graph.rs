//! Item/recipe graph and the active-tree overlay.
//!
//! [`ItemGraph`] is an arena of [`Item`]s indexed by name. It is built once per
//! product query from raw [`RecipeRecord`]s and is read-only afterwards.
//!
//! [`ActiveTree`] is the overlay recording which recipe is active for each item
//! and which active recipes consume it. The session replaces the whole overlay
//! on every selection instead of patching items in place.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::error::{CraftError, Result};
use crate::models::{ActionKind, Ingredient, Item, ItemUse, Recipe, RecipeRecord};

/// Stable index of an item inside an [`ItemGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(usize);

/// All items and recipes known for one product query.
#[derive(Debug, Clone, Default)]
pub struct ItemGraph {
    items: Vec<Item>,
    index: HashMap<String, ItemId>,
}

impl ItemGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from raw records.
    ///
    /// Every record and every ingredient entry carrying market data defines an
    /// item. Records repeating an item name add their recipe to that item.
    /// Once everything is registered, every ingredient must resolve to an item.
    ///
    /// An ingredient entry with an `_id` only lists the recipe: it knows
    /// nothing of that recipe's ingredients, so it is never craftable. A
    /// record defining the same recipe id replaces the listing.
    ///
    /// # Errors
    ///
    /// - [`CraftError::MalformedRecord`] when a record has no `Name` or no
    ///   market price, or an ingredient has no name or amount.
    /// - [`CraftError::UnknownItemReference`] when an ingredient names an item
    ///   no record defines.
    ///
    /// # Example
    ///
    /// ```
    /// use craftprofit::data::parse_records;
    /// use craftprofit::graph::ItemGraph;
    ///
    /// let records = parse_records(r#"[
    ///     {"_id": "r1", "Name": "Plank", "Market Data": {"Market Price": 200},
    ///      "Ingredients": [{"Item Name": "Log", "Amount": 2, "Market Data": {"Market Price": 20}}],
    ///      "Quantity Produced": 1, "Time to Produce": 2}
    /// ]"#).unwrap();
    ///
    /// let graph = ItemGraph::from_records(&records).unwrap();
    /// assert_eq!(graph.len(), 2);
    /// ```
    pub fn from_records(records: &[RecipeRecord]) -> Result<Self> {
        let mut graph = ItemGraph::new();
        let mut listings: HashSet<(ItemId, String)> = HashSet::new();

        for (index, record) in records.iter().enumerate() {
            let name = record
                .name
                .as_deref()
                .ok_or_else(|| malformed(index, "missing `Name`".to_string()))?;
            let market_price = record
                .market_price()
                .ok_or_else(|| malformed(index, format!("`{}` has no market price", name)))?;

            let id = graph.register(name, market_price, record.depth);

            let mut ingredients = Vec::with_capacity(record.ingredients.len());
            for ingredient in &record.ingredients {
                let ingredient_name = ingredient.name().ok_or_else(|| {
                    malformed(index, format!("ingredient of `{}` has no name", name))
                })?;
                let amount = ingredient.amount.ok_or_else(|| {
                    malformed(
                        index,
                        format!("ingredient `{}` of `{}` has no `Amount`", ingredient_name, name),
                    )
                })?;

                if let Some(price) = ingredient.market_price() {
                    let ingredient_id = graph.register(ingredient_name, price, ingredient.depth);
                    if let Some(ref recipe_id) = ingredient.id {
                        let added = graph.items[ingredient_id.0].add_recipe(Recipe {
                            id: recipe_id.clone(),
                            produced_item_name: ingredient_name.to_string(),
                            ingredients: Vec::new(),
                            quantity_produced: None,
                            time_to_produce: ingredient.time_to_produce,
                        });
                        if added {
                            listings.insert((ingredient_id, recipe_id.clone()));
                        }
                    }
                }

                ingredients.push(Ingredient::new(ingredient_name, amount));
            }

            if let Some(ref recipe_id) = record.id {
                let recipe = Recipe {
                    id: recipe_id.clone(),
                    produced_item_name: name.to_string(),
                    ingredients,
                    quantity_produced: record.quantity_produced,
                    time_to_produce: record.time_to_produce,
                };
                if listings.remove(&(id, recipe_id.clone())) {
                    graph.items[id.0].replace_recipe(recipe);
                } else {
                    graph.items[id.0].add_recipe(recipe);
                }
            }
        }

        graph.validate_references()?;
        debug!(items = graph.len(), "built item graph");
        Ok(graph)
    }

    /// Adds an item, or returns the existing id when the name is already known.
    ///
    /// The first market price registered for a name wins.
    pub fn add_item(&mut self, item: Item) -> ItemId {
        if let Some(&id) = self.index.get(&item.name) {
            for recipe in item.recipes {
                self.items[id.0].add_recipe(recipe);
            }
            return id;
        }
        let id = ItemId(self.items.len());
        self.index.insert(item.name.clone(), id);
        self.items.push(item);
        id
    }

    /// Adds another recipe to an existing item.
    ///
    /// Returns `Ok(false)` when the item already has a recipe with that id.
    pub fn add_recipe(&mut self, recipe: Recipe) -> Result<bool> {
        let id = self.require(&recipe.produced_item_name, &recipe.id)?;
        for ingredient in &recipe.ingredients {
            self.require(&ingredient.item_name, &recipe.produced_item_name)?;
        }
        Ok(self.items[id.0].add_recipe(recipe))
    }

    pub fn id(&self, name: &str) -> Option<ItemId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&Item> {
        self.id(name).map(|id| &self.items[id.0])
    }

    /// Looks up an item that `referenced_by` depends on.
    pub fn item(&self, name: &str, referenced_by: &str) -> Result<&Item> {
        self.get(name).ok_or_else(|| CraftError::UnknownItemReference {
            item: name.to_string(),
            referenced_by: referenced_by.to_string(),
        })
    }

    pub fn item_by_id(&self, id: ItemId) -> &Item {
        &self.items[id.0]
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Checks that every ingredient of every recipe names a known item.
    pub fn validate_references(&self) -> Result<()> {
        for item in &self.items {
            for recipe in &item.recipes {
                for ingredient in &recipe.ingredients {
                    self.require(&ingredient.item_name, &item.name)?;
                }
            }
        }
        Ok(())
    }

    fn register(&mut self, name: &str, market_price: f64, depth: Option<i32>) -> ItemId {
        let mut item = Item::new(name, market_price);
        if let Some(depth) = depth {
            item.depth = depth;
        }
        self.add_item(item)
    }

    fn require(&self, name: &str, referenced_by: &str) -> Result<ItemId> {
        self.id(name).ok_or_else(|| CraftError::UnknownItemReference {
            item: name.to_string(),
            referenced_by: referenced_by.to_string(),
        })
    }
}

fn malformed(index: usize, reason: String) -> CraftError {
    CraftError::MalformedRecord { index, reason }
}

/// Active recipe and back-references of one item in the active tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveEntry {
    /// `None` means the item is bought
    pub active_recipe_id: Option<String>,
    pub used_in: Vec<ItemUse>,
}

/// Overlay describing the currently active decision tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveTree {
    entries: BTreeMap<ItemId, ActiveEntry>,
}

impl ActiveTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `parent_recipe_id` of `parent_name` consumes `item`.
    ///
    /// A second use from the same parent recipe is ignored. A use recorded as
    /// Buy never clears a recipe set by an earlier Craft use.
    pub fn add_use(
        &mut self,
        item: ItemId,
        action_taken: ActionKind,
        parent_name: Option<&str>,
        parent_recipe_id: Option<&str>,
        active_recipe_id: Option<&str>,
    ) {
        let entry = self.entries.entry(item).or_default();
        let already_used = entry.used_in.iter().any(|u| {
            u.parent_name.as_deref() == parent_name
                && u.parent_recipe_id.as_deref() == parent_recipe_id
        });
        if already_used {
            return;
        }
        entry.used_in.push(ItemUse {
            action_taken,
            parent_name: parent_name.map(str::to_string),
            parent_recipe_id: parent_recipe_id.map(str::to_string),
        });
        if let Some(recipe_id) = active_recipe_id {
            entry.active_recipe_id = Some(recipe_id.to_string());
        }
    }

    /// Clears the uses and the active recipe of one item.
    pub fn reset_uses(&mut self, item: ItemId) {
        self.entries.remove(&item);
    }

    pub fn entry(&self, item: ItemId) -> Option<&ActiveEntry> {
        self.entries.get(&item)
    }

    pub fn active_recipe_id(&self, item: ItemId) -> Option<&str> {
        self.entries
            .get(&item)
            .and_then(|e| e.active_recipe_id.as_deref())
    }

    pub fn used_in(&self, item: ItemId) -> &[ItemUse] {
        self.entries
            .get(&item)
            .map(|e| e.used_in.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.entries.contains_key(&item)
    }

    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
