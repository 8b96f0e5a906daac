//! Buy-vs-Craft optimization over the recipe tree.
//!
//! For a root item, every craftable recipe is tried as the fixed root choice.
//! Under each, every reachable ingredient gets a Buy action and, when it has a
//! craftable recipe, the Craft action of its most profitable recipe. The
//! result is one [`ActionSet`] per root recipe.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info, warn};

use crate::calculator::{profit, ProfitConfig};
use crate::error::{CraftError, Result};
use crate::graph::ItemGraph;
use crate::models::{Action, ActionKind, ActionSet, Item, ItemActions, Recipe};

/// One optimal [`ActionSet`] per craftable recipe of the root item.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimalActionSets {
    pub root_item: String,
    /// In recipe declaration order
    pub sets: Vec<ActionSet>,
}

impl OptimalActionSets {
    pub fn get(&self, recipe_id: &str) -> Option<&ActionSet> {
        self.sets.iter().find(|s| s.root_recipe_id == recipe_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionSet> {
        self.sets.iter()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// The set whose root Craft action yields the highest profit.
    ///
    /// Ties keep the recipe declared first.
    pub fn best(&self, graph: &ItemGraph, config: &ProfitConfig) -> Result<&ActionSet> {
        let market_price = graph.item(&self.root_item, "optimizer")?.market_price;

        let mut best: Option<(&ActionSet, f64)> = None;
        for set in &self.sets {
            let set_profit = profit(market_price, set.root_craft()?.monetary_cost, config);
            match best {
                Some((_, best_profit)) if set_profit <= best_profit => {}
                _ => best = Some((set, set_profit)),
            }
        }

        let (set, best_profit) =
            best.ok_or_else(|| CraftError::NoCraftableRecipe(self.root_item.clone()))?;
        info!(
            item = %self.root_item,
            recipe = %set.root_recipe_id,
            profit = best_profit,
            "selected optimal root recipe"
        );
        Ok(set)
    }
}

/// Memo and recursion stack threaded through one optimization pass.
struct Evaluation<'a> {
    graph: &'a ItemGraph,
    config: &'a ProfitConfig,
    memo: BTreeMap<String, ItemActions>,
    in_progress: HashSet<String>,
}

impl<'a> Evaluation<'a> {
    fn new(graph: &'a ItemGraph, config: &'a ProfitConfig) -> Self {
        Evaluation {
            graph,
            config,
            memo: BTreeMap::new(),
            in_progress: HashSet::new(),
        }
    }
}

/// Computes one optimal action set per craftable recipe of `root`.
///
/// # Errors
///
/// - [`CraftError::UnknownItemReference`] if `root` or a reachable ingredient
///   is not in the graph.
/// - [`CraftError::NoCraftableRecipe`] if `root` cannot be crafted at all.
///
/// # Example
///
/// ```
/// use craftprofit::calculator::ProfitConfig;
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
///
/// let sets = find_optimal_action_sets(&graph, "Plank", &config).unwrap();
/// let best = sets.best(&graph, &config).unwrap();
/// assert_eq!(best.root_craft().unwrap().monetary_cost, 40.0);
/// ```
pub fn find_optimal_action_sets(
    graph: &ItemGraph,
    root: &str,
    config: &ProfitConfig,
) -> Result<OptimalActionSets> {
    let item = graph.item(root, "optimizer")?;

    let mut sets = Vec::new();
    for recipe in item.craftable_recipes() {
        let set = optimal_actions_rooted_at(graph, root, &recipe.id, config)?;
        debug!(
            item = root,
            recipe = %recipe.id,
            reachable = set.actions.len(),
            "evaluated root recipe"
        );
        sets.push(set);
    }

    if sets.is_empty() {
        return Err(CraftError::NoCraftableRecipe(root.to_string()));
    }

    Ok(OptimalActionSets {
        root_item: root.to_string(),
        sets,
    })
}

/// Computes optimal actions for everything below `item_name` with its recipe
/// fixed to `recipe_id`.
///
/// Used for the root candidates of [`find_optimal_action_sets`].
pub fn optimal_actions_rooted_at(
    graph: &ItemGraph,
    item_name: &str,
    recipe_id: &str,
    config: &ProfitConfig,
) -> Result<ActionSet> {
    optimal_actions_below(graph, item_name, recipe_id, &HashSet::new(), config)
}

/// Like [`optimal_actions_rooted_at`], for an item crafted inside a larger
/// tree.
///
/// `ancestors` are the items on the path from the tree root down to
/// `item_name`. They count as already being evaluated, so a cycle leading back
/// to one of them is bought at the cyclic point, and none of them appears in
/// the returned set.
pub fn optimal_actions_below(
    graph: &ItemGraph,
    item_name: &str,
    recipe_id: &str,
    ancestors: &HashSet<String>,
    config: &ProfitConfig,
) -> Result<ActionSet> {
    let item = graph.item(item_name, "optimizer")?;
    let recipe = item.craftable_recipe(recipe_id)?;

    let mut eval = Evaluation::new(graph, config);
    eval.in_progress.extend(ancestors.iter().cloned());
    eval.in_progress.insert(item.name.clone());
    let craft = evaluate_recipe(&mut eval, item, recipe)?;
    eval.in_progress.remove(&item.name);

    eval.memo.insert(
        item.name.clone(),
        ItemActions {
            buy: buy_action(item, config),
            craft: Some(craft),
            preferred: ActionKind::Craft,
        },
    );

    Ok(ActionSet {
        root_item: item.name.clone(),
        root_recipe_id: recipe.id.clone(),
        actions: eval.memo,
    })
}

/// Buying costs the market price and takes no time.
pub fn buy_action(item: &Item, config: &ProfitConfig) -> Action {
    Action {
        kind: ActionKind::Buy,
        recipe_id: None,
        monetary_cost: item.market_price,
        time_per_unit: 0.0,
        resulting_profit: profit(item.market_price, item.market_price, config),
    }
}

/// Evaluates an ingredient and returns the action its parent should assume.
fn evaluate_item(eval: &mut Evaluation<'_>, name: &str, referenced_by: &str) -> Result<Action> {
    if let Some(actions) = eval.memo.get(name) {
        return Ok(actions.preferred_action().clone());
    }

    let graph = eval.graph;
    let item = graph.item(name, referenced_by)?;

    if eval.in_progress.contains(name) {
        warn!(item = name, parent = referenced_by, "crafting cycle, buying at cyclic point");
        return Ok(buy_action(item, eval.config));
    }

    eval.in_progress.insert(name.to_string());
    let mut best_craft: Option<Action> = None;
    for recipe in item.craftable_recipes() {
        let candidate = evaluate_recipe(eval, item, recipe)?;
        if is_better_craft(&candidate, best_craft.as_ref()) {
            best_craft = Some(candidate);
        }
    }
    eval.in_progress.remove(name);

    let buy = buy_action(item, eval.config);
    let preferred = match best_craft {
        Some(ref craft) if craft.resulting_profit > buy.resulting_profit => ActionKind::Craft,
        _ => ActionKind::Buy,
    };
    let actions = ItemActions {
        buy,
        craft: best_craft,
        preferred,
    };
    let chosen = actions.preferred_action().clone();
    debug!(item = name, action = preferred.as_str(), cost = chosen.monetary_cost, "evaluated item");
    eval.memo.insert(name.to_string(), actions);
    Ok(chosen)
}

/// Per-unit cost and time of crafting `item` through `recipe`, with every
/// ingredient acquired by its preferred action.
fn evaluate_recipe(eval: &mut Evaluation<'_>, item: &Item, recipe: &Recipe) -> Result<Action> {
    let mut cost = 0.0;
    let mut time = recipe.craft_time();

    for ingredient in &recipe.ingredients {
        let action = evaluate_item(eval, &ingredient.item_name, &item.name)?;
        cost += ingredient.amount_per_craft * action.monetary_cost;
        time += ingredient.amount_per_craft * action.time_per_unit;
    }

    let quantity = recipe.yield_per_craft();
    let unit_cost = cost / quantity;
    Ok(Action {
        kind: ActionKind::Craft,
        recipe_id: Some(recipe.id.clone()),
        monetary_cost: unit_cost,
        time_per_unit: time / quantity,
        resulting_profit: profit(item.market_price, unit_cost, eval.config),
    })
}

/// Higher profit wins, then lower cost. Equal candidates keep the earlier one.
fn is_better_craft(candidate: &Action, current: Option<&Action>) -> bool {
    match current {
        None => true,
        Some(current) => {
            candidate.resulting_profit > current.resulting_profit
                || (candidate.resulting_profit == current.resulting_profit
                    && candidate.monetary_cost < current.monetary_cost)
        }
    }
}
