//! Selection and cascade controller.
//!
//! A [`Session`] owns the graph for one root product, the optimizer's action
//! sets, the governing action set currently in force, the active-tree overlay
//! derived from it, and the shopping cart for the chosen craft count.
//!
//! Every selection builds a new governing set, re-derives the overlay from the
//! root, and recomputes the cart. Nothing is committed unless all three
//! succeed, so a rejected selection leaves the session untouched.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::calculator::{profit, ProfitConfig, ProfitSummary};
use crate::cart::{calculate_costs_with_action_set, ShoppingCart, DEFAULT_CRAFT_COUNT};
use crate::error::{CraftError, Result};
use crate::graph::{ActiveTree, ItemGraph};
use crate::models::{ActionKind, ActionSet, ItemActions, ItemUse, RecipeRecord, ShoppingCartEntry};
use crate::optimizer::{
    buy_action, find_optimal_action_sets, optimal_actions_below, OptimalActionSets,
};

/// One ingredient row of an item's active recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientRow {
    pub item_name: String,
    pub amount_per_craft: f64,
    /// `amount_per_craft` times every craft of the parent in the cart
    pub total_needed: f64,
}

/// A cart entry together with its profit figures.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub entry: ShoppingCartEntry,
    pub profit: ProfitSummary,
}

/// Everything the presentation layer needs to render one item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemView {
    pub name: String,
    pub market_price: f64,
    pub depth: i32,
    /// Craftable recipe ids, in declaration order
    pub recipe_ids: Vec<String>,
    pub active_recipe_id: Option<String>,
    pub used_in: Vec<ItemUse>,
    pub ingredients: Vec<IngredientRow>,
    pub shopping_cart: Vec<CartLine>,
}

/// Optimization state for one root product.
#[derive(Debug, Clone)]
pub struct Session {
    graph: ItemGraph,
    config: ProfitConfig,
    craft_count: u32,
    root: String,
    action_sets: OptimalActionSets,
    governing: ActionSet,
    active: ActiveTree,
    cart: ShoppingCart,
}

impl Session {
    /// Optimizes `root` and applies the most profitable root recipe.
    ///
    /// # Example
    ///
    /// ```
    /// use craftprofit::calculator::ProfitConfig;
    /// use craftprofit::data::parse_records;
    /// use craftprofit::graph::ItemGraph;
    /// use craftprofit::session::Session;
    ///
    /// let records = parse_records(r#"[
    ///     {"_id": "r1", "Name": "Plank", "Market Data": {"Market Price": 200},
    ///      "Ingredients": [{"Item Name": "Log", "Amount": 2, "Market Data": {"Market Price": 20}}],
    ///      "Quantity Produced": 1, "Time to Produce": 2}
    /// ]"#).unwrap();
    /// let graph = ItemGraph::from_records(&records).unwrap();
    ///
    /// let session = Session::new(graph, "Plank", ProfitConfig::default(), 100).unwrap();
    /// assert_eq!(session.active_recipe_id("Plank"), Some("r1"));
    /// assert_eq!(session.cart().entry_for("Log", Some("Plank")).unwrap().expected_count, 200);
    /// ```
    pub fn new(graph: ItemGraph, root: &str, config: ProfitConfig, craft_count: u32) -> Result<Self> {
        config.validate()?;
        validate_craft_count(craft_count)?;

        let action_sets = find_optimal_action_sets(&graph, root, &config)?;
        let governing = action_sets.best(&graph, &config)?.clone();

        let mut session = Session {
            graph,
            config,
            craft_count,
            root: root.to_string(),
            action_sets,
            governing: governing.clone(),
            active: ActiveTree::new(),
            cart: ShoppingCart::default(),
        };
        session.apply(governing)?;
        Ok(session)
    }

    /// Builds the graph from raw records and starts a session with the
    /// default craft count.
    pub fn from_records(records: &[RecipeRecord], root: &str, config: ProfitConfig) -> Result<Self> {
        let graph = ItemGraph::from_records(records)?;
        Session::new(graph, root, config, DEFAULT_CRAFT_COUNT)
    }

    /// Re-applies the most profitable root recipe, discarding manual choices.
    pub fn reset_to_optimal(&mut self) -> Result<()> {
        let recipe_id = self
            .action_sets
            .best(&self.graph, &self.config)?
            .root_recipe_id
            .clone();
        let root = self.root.clone();
        self.select_recipe(&root, &recipe_id)
    }

    /// Crafts `item_name` with `recipe_id` and re-optimizes everything below it.
    ///
    /// Selecting a root recipe reuses its precomputed action set. Selecting a
    /// recipe further down re-derives optimal actions under that item, keeping
    /// the decisions made elsewhere in the tree. The items above it stay as
    /// they are; a cycle leading back up to one of them is bought there.
    ///
    /// # Errors
    ///
    /// - [`CraftError::UnknownItemReference`] for an unknown item.
    /// - [`CraftError::UnknownRecipe`] / [`CraftError::RecipeNotCraftable`]
    ///   when the recipe cannot be crafted.
    /// - [`CraftError::InvalidSelection`] when the item is not in the active tree.
    pub fn select_recipe(&mut self, item_name: &str, recipe_id: &str) -> Result<()> {
        let item = self.graph.item(item_name, "selection")?;
        item.craftable_recipe(recipe_id)?;

        let governing = if item_name == self.root {
            self.action_sets
                .get(recipe_id)
                .cloned()
                .ok_or_else(|| CraftError::UnknownRecipe {
                    item: item_name.to_string(),
                    recipe_id: recipe_id.to_string(),
                })?
        } else {
            self.ensure_active(item_name)?;
            let ancestors = self.ancestors_of(item_name);
            let mut below =
                optimal_actions_below(&self.graph, item_name, recipe_id, &ancestors, &self.config)?;
            below
                .actions
                .retain(|name, _| *name != self.root && !ancestors.contains(name));

            let mut governing = self.governing.clone();
            governing.merge(below);
            governing
        };

        info!(item = item_name, recipe = recipe_id, "recipe selected");
        self.apply(governing)
    }

    /// Buys `item_name` instead of crafting it.
    ///
    /// The root item is always crafted and cannot be bought.
    pub fn select_buy(&mut self, item_name: &str) -> Result<()> {
        let item = self.graph.item(item_name, "selection")?;
        if item_name == self.root {
            return Err(CraftError::InvalidSelection {
                item: item_name.to_string(),
                reason: "the root item is always crafted".to_string(),
            });
        }
        self.ensure_active(item_name)?;

        let mut governing = self.governing.clone();
        governing
            .actions
            .entry(item_name.to_string())
            .and_modify(|a| a.preferred = ActionKind::Buy)
            .or_insert_with(|| ItemActions {
                buy: buy_action(item, &self.config),
                craft: None,
                preferred: ActionKind::Buy,
            });

        info!(item = item_name, "buy selected");
        self.apply(governing)
    }

    /// Changes how many root units to produce. Only the cart is recomputed.
    pub fn set_craft_count(&mut self, craft_count: u32) -> Result<()> {
        validate_craft_count(craft_count)?;
        self.cart =
            calculate_costs_with_action_set(&self.graph, &self.governing, craft_count, &self.config)?;
        self.craft_count = craft_count;
        Ok(())
    }

    /// Replaces the profit configuration, re-runs the optimizer and resets to
    /// the new optimum.
    pub fn set_config(&mut self, config: ProfitConfig) -> Result<()> {
        config.validate()?;
        let action_sets = find_optimal_action_sets(&self.graph, &self.root, &config)?;
        let governing = action_sets.best(&self.graph, &config)?.clone();

        let previous = (self.config, std::mem::replace(&mut self.action_sets, action_sets));
        self.config = config;
        if let Err(e) = self.apply(governing) {
            self.config = previous.0;
            self.action_sets = previous.1;
            return Err(e);
        }
        Ok(())
    }

    pub fn graph(&self) -> &ItemGraph {
        &self.graph
    }

    pub fn config(&self) -> &ProfitConfig {
        &self.config
    }

    pub fn craft_count(&self) -> u32 {
        self.craft_count
    }

    pub fn root_item(&self) -> &str {
        &self.root
    }

    pub fn action_sets(&self) -> &OptimalActionSets {
        &self.action_sets
    }

    /// The action set the active tree currently follows.
    pub fn governing_actions(&self) -> &ActionSet {
        &self.governing
    }

    pub fn active_tree(&self) -> &ActiveTree {
        &self.active
    }

    pub fn cart(&self) -> &ShoppingCart {
        &self.cart
    }

    pub fn active_recipe_id(&self, item_name: &str) -> Option<&str> {
        self.graph
            .id(item_name)
            .and_then(|id| self.active.active_recipe_id(id))
    }

    pub fn used_in(&self, item_name: &str) -> &[ItemUse] {
        match self.graph.id(item_name) {
            Some(id) => self.active.used_in(id),
            None => &[],
        }
    }

    /// Items of the active tree, ordered by depth.
    pub fn item_views(&self) -> Vec<ItemView> {
        let mut views: Vec<ItemView> = self
            .graph
            .items()
            .filter_map(|item| {
                let id = self.graph.id(&item.name)?;
                let entry = self.active.entry(id)?;

                let crafts: u64 = self
                    .cart
                    .entries_for(&item.name)
                    .iter()
                    .map(|e| e.craft_count)
                    .sum();
                let ingredients = entry
                    .active_recipe_id
                    .as_deref()
                    .and_then(|r| item.recipe(r))
                    .map(|recipe| {
                        recipe
                            .ingredients
                            .iter()
                            .map(|i| IngredientRow {
                                item_name: i.item_name.clone(),
                                amount_per_craft: i.amount_per_craft,
                                total_needed: i.amount_per_craft * crafts as f64,
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                let shopping_cart = self
                    .cart
                    .entries_for(&item.name)
                    .iter()
                    .map(|e| CartLine {
                        entry: e.clone(),
                        profit: ProfitSummary::for_entry(item.market_price, e, &self.config),
                    })
                    .collect();

                Some(ItemView {
                    name: item.name.clone(),
                    market_price: item.market_price,
                    depth: item.depth,
                    recipe_ids: item.craftable_recipes().map(|r| r.id.clone()).collect(),
                    active_recipe_id: entry.active_recipe_id.clone(),
                    used_in: entry.used_in.clone(),
                    ingredients,
                    shopping_cart,
                })
            })
            .collect();
        views.sort_by_key(|v| v.depth);
        views
    }

    fn ensure_active(&self, item_name: &str) -> Result<()> {
        let active = self
            .graph
            .id(item_name)
            .is_some_and(|id| self.active.contains(id));
        if !active {
            return Err(CraftError::InvalidSelection {
                item: item_name.to_string(),
                reason: "not part of the active tree".to_string(),
            });
        }
        Ok(())
    }

    /// Items on any path from the root down to `target` in the active tree,
    /// `target` excluded.
    fn ancestors_of(&self, target: &str) -> HashSet<String> {
        let mut walk = AncestorWalk {
            session: self,
            target,
            reaches: HashMap::new(),
            path: HashSet::new(),
        };
        walk.reaches_target(&self.root);
        walk.reaches
            .into_iter()
            .filter_map(|(name, reaches)| (reaches && name != target).then_some(name))
            .collect()
    }

    /// Derives the overlay and the cart from `governing`, then commits all three.
    fn apply(&mut self, mut governing: ActionSet) -> Result<()> {
        let tree = build_active_tree(&self.graph, &governing)?;
        let cart =
            calculate_costs_with_action_set(&self.graph, &governing, self.craft_count, &self.config)?;
        refresh_craft_costs(&self.graph, &mut governing, &cart, &self.config);

        let dropped: Vec<&str> = self
            .active
            .item_ids()
            .filter(|id| !tree.contains(*id))
            .map(|id| self.graph.item_by_id(id).name.as_str())
            .collect();
        if !dropped.is_empty() {
            debug!(?dropped, "items left the active tree");
        }

        self.active = tree;
        self.governing = governing;
        self.cart = cart;
        Ok(())
    }
}

fn validate_craft_count(craft_count: u32) -> Result<()> {
    if craft_count == 0 {
        return Err(CraftError::InvalidConfig(
            "craft count must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Overwrites the Craft actions the cart followed with the per-unit cost and
/// time it computed, so they reflect choices made below them after the
/// optimizer ran.
fn refresh_craft_costs(
    graph: &ItemGraph,
    governing: &mut ActionSet,
    cart: &ShoppingCart,
    config: &ProfitConfig,
) {
    for (name, actions) in governing.actions.iter_mut() {
        let Some(entry) = cart
            .entries_for(name)
            .iter()
            .find(|e| e.action == ActionKind::Craft)
        else {
            continue;
        };
        let (Some(item), Some(craft)) = (graph.get(name), actions.craft.as_mut()) else {
            continue;
        };
        craft.monetary_cost = entry.individual_price;
        craft.time_per_unit = entry.cumulative_time_spent;
        craft.resulting_profit = profit(item.market_price, entry.individual_price, config);
    }
}

/// Builds a fresh overlay by cascading `governing` down from its root.
pub fn build_active_tree(graph: &ItemGraph, governing: &ActionSet) -> Result<ActiveTree> {
    let mut tree = ActiveTree::new();
    let mut cascade = Cascade {
        graph,
        governing,
        tree: &mut tree,
        stack: HashSet::new(),
        expanded: HashSet::new(),
    };
    cascade.visit(&governing.root_item, None)?;
    Ok(tree)
}

struct Cascade<'a> {
    graph: &'a ItemGraph,
    governing: &'a ActionSet,
    tree: &'a mut ActiveTree,
    /// Items whose recipe is being expanded above the current node
    stack: HashSet<String>,
    /// Items whose ingredients have already been cascaded
    expanded: HashSet<String>,
}

impl Cascade<'_> {
    /// Records the use of `name` by `parent` (item, recipe) and descends into
    /// its recipe when it is crafted.
    fn visit(&mut self, name: &str, parent: Option<(&str, &str)>) -> Result<()> {
        let graph = self.graph;
        let referenced_by = parent.map(|(p, _)| p).unwrap_or("cascade");
        let item = graph.item(name, referenced_by)?;
        let id = graph.id(name).ok_or_else(|| CraftError::UnknownItemReference {
            item: name.to_string(),
            referenced_by: referenced_by.to_string(),
        })?;

        let recipe_id = if self.stack.contains(name) {
            None
        } else {
            match self.governing.preferred(name) {
                Ok(action) if action.kind == ActionKind::Craft => action.recipe_id.clone(),
                Ok(_) => None,
                Err(CraftError::NoEligibleAction(_)) => {
                    debug!(item = name, "no eligible action, stopping cascade");
                    None
                }
                Err(e) => return Err(e),
            }
        };
        let action_taken = if recipe_id.is_some() {
            ActionKind::Craft
        } else {
            ActionKind::Buy
        };

        self.tree.add_use(
            id,
            action_taken,
            parent.map(|(p, _)| p),
            parent.map(|(_, r)| r),
            recipe_id.as_deref(),
        );

        let Some(recipe_id) = recipe_id else {
            return Ok(());
        };
        if !self.expanded.insert(name.to_string()) {
            return Ok(());
        }

        let recipe = item.craftable_recipe(&recipe_id)?;
        self.stack.insert(name.to_string());
        for ingredient in &recipe.ingredients {
            self.visit(&ingredient.item_name, Some((name, recipe_id.as_str())))?;
        }
        self.stack.remove(name);
        Ok(())
    }
}

/// Depth-first search over crafted items of the active tree, remembering
/// which of them lead down to the target.
struct AncestorWalk<'a> {
    session: &'a Session,
    target: &'a str,
    reaches: HashMap<String, bool>,
    path: HashSet<String>,
}

impl AncestorWalk<'_> {
    fn reaches_target(&mut self, name: &str) -> bool {
        if name == self.target {
            self.reaches.insert(name.to_string(), true);
            return true;
        }
        if let Some(&known) = self.reaches.get(name) {
            return known;
        }
        if self.path.contains(name) {
            return false;
        }

        let session = self.session;
        let recipe = session
            .active_recipe_id(name)
            .and_then(|r| session.graph.get(name)?.recipe(r));
        let Some(recipe) = recipe else {
            self.reaches.insert(name.to_string(), false);
            return false;
        };

        self.path.insert(name.to_string());
        let mut reaches = false;
        for ingredient in &recipe.ingredients {
            reaches |= self.reaches_target(&ingredient.item_name);
        }
        self.path.remove(name);

        self.reaches.insert(name.to_string(), reaches);
        reaches
    }
}
