//! Error types for craftprofit.
//!
//! - [`MalformedRecord`] a raw recipe record is missing a required field.
//! - [`UnknownItemReference`] an ingredient names an item that was never defined.
//! - [`NoEligibleAction`] neither Buy nor Craft is known for a node. The cascade
//!   treats this as a leaf and never surfaces it.
//!
//!  [`MalformedRecord`]: CraftError::MalformedRecord
//!  [`UnknownItemReference`]: CraftError::UnknownItemReference
//!  [`NoEligibleAction`]: CraftError::NoEligibleAction
use thiserror::Error;

/// Errors raised while building the graph, optimizing, or applying selections.
#[derive(Error, Debug)]
pub enum CraftError {
    #[error("malformed record #{index}: {reason}")]
    MalformedRecord { index: usize, reason: String },
    #[error("`{item}` is referenced by `{referenced_by}` but was never defined")]
    UnknownItemReference { item: String, referenced_by: String },
    #[error("`{item}` has no recipe `{recipe_id}`")]
    UnknownRecipe { item: String, recipe_id: String },
    #[error("recipe `{recipe_id}` of `{item}` cannot be crafted")]
    RecipeNotCraftable { item: String, recipe_id: String },
    #[error("`{0}` has no craftable recipe")]
    NoCraftableRecipe(String),
    #[error("no eligible action for `{0}`")]
    NoEligibleAction(String),
    #[error("cannot select `{item}`: {reason}")]
    InvalidSelection { item: String, reason: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, CraftError>;
