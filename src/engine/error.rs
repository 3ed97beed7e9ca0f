//! Engine errors and diagnostics

use serde::Serialize;
use thiserror::Error;

use crate::models::{GroupingId, Nutrient};

/// Errors raised while scaling or summarising selections
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Invalid keystone: {0}")]
    InvalidKeystone(String),

    #[error("Total weight of the selections is zero")]
    ZeroTotalWeight,

    #[error("Invalid weight {grams} for ingredient {ingredient}")]
    InvalidWeight { ingredient: String, grams: f64 },

    #[error("Ingredient {0} is already selected")]
    DuplicateSelection(String),

    #[error("Unit count must be at least 1")]
    InvalidUnitCount,

    #[error("Grouping {0} is not configured")]
    UnknownGrouping(GroupingId),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// A nutrient value left out of an aggregate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingNutrient {
    pub ingredient_id: String,
    pub ingredient_name: String,
    pub nutrient: Nutrient,
    /// The stored value: the missing sentinel or an invalid negative
    pub value: f64,
}

impl std::fmt::Display for MissingNutrient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) has no usable {} value",
            self.ingredient_name, self.ingredient_id, self.nutrient
        )
    }
}
