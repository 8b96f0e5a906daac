//! # craftprofit
//!
//! A command-line tool and library deciding, for every node of a crafting
//! item's ingredient tree, whether to buy or craft it so the chosen root recipe
//! is as profitable as possible.
//!
//! Given raw recipe records and market prices, it:
//!
//! - Builds the item/recipe graph
//! - Computes one optimal Buy/Craft action set per recipe of the root item
//! - Applies the most profitable set, or the user's manual recipe choices
//! - Aggregates quantities, per-unit price and crafting time for a craft count
//! - Derives profit and profit-per-second figures, including selling tax and
//!   the optional value pack
//!
//! ## Modules
//!
//! - [`models`] - Items, recipes, actions, cart entries and raw records
//! - [`graph`] - Item arena and the active-tree overlay
//! - [`data`] - JSON record loading
//! - [`calculator`] - Profit math and its configuration
//! - [`optimizer`] - Action-set optimization
//! - [`cart`] - Shopping cart aggregation
//! - [`session`] - Recipe selection and cascade
//! - [`display`] - Text and CSV output
//! - [`wasm`] - JSON bindings for JavaScript
//!
//! ## Example Usage
//!
//! ```no_run
//! use craftprofit::{
//!     calculator::ProfitConfig,
//!     data::load_records,
//!     display::render_session,
//!     graph::ItemGraph,
//!     session::Session,
//! };
//! use std::path::Path;
//!
//! let records = load_records(Path::new("recipes.json")).unwrap();
//! let graph = ItemGraph::from_records(&records).unwrap();
//!
//! // Craft 100 planks, selling with the value pack
//! let config = ProfitConfig { value_pack_enabled: true, ..ProfitConfig::default() };
//! let mut session = Session::new(graph, "Plank", config, 100).unwrap();
//!
//! // Override the optimizer: buy logs instead of crafting them
//! session.select_buy("Log").unwrap();
//! println!("{}", render_session(&session));
//! ```

pub mod calculator;
pub mod cart;
pub mod data;
pub mod display;
pub mod error;
pub mod graph;
pub mod models;
pub mod optimizer;
pub mod session;
pub mod wasm;

pub use error::{CraftError, Result};
