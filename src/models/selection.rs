//! Weighted ingredient selections
//!
//! The amount a selection carries is interpreted by its type: grams for an
//! [`AbsoluteSelection`], a multiple of the keystone weight for a
//! [`RatioSelection`].

use std::sync::Arc;

use super::Ingredient;

/// An ingredient with an absolute weight in grams
#[derive(Debug, Clone, PartialEq)]
pub struct AbsoluteSelection {
    pub ingredient: Arc<Ingredient>,
    pub grams: f64,
    /// Show this ingredient's percentage in the contents list
    pub append_percent: bool,
}

/// An ingredient weighed relative to a recipe's keystone
#[derive(Debug, Clone, PartialEq)]
pub struct RatioSelection {
    pub ingredient: Arc<Ingredient>,
    pub ratio: f64,
    pub append_percent: bool,
}

impl AbsoluteSelection {
    pub fn new(ingredient: Arc<Ingredient>, grams: f64) -> Self {
        Self {
            ingredient,
            grams,
            append_percent: false,
        }
    }

    pub fn with_percent(mut self) -> Self {
        self.append_percent = true;
        self
    }

    pub fn ingredient_id(&self) -> &str {
        &self.ingredient.id
    }
}

impl RatioSelection {
    pub fn new(ingredient: Arc<Ingredient>, ratio: f64) -> Self {
        Self {
            ingredient,
            ratio,
            append_percent: false,
        }
    }

    pub fn with_percent(mut self) -> Self {
        self.append_percent = true;
        self
    }

    pub fn ingredient_id(&self) -> &str {
        &self.ingredient.id
    }

    /// Grams for a given keystone weight and batch count
    pub fn grams_for(&self, keystone_grams: f64, batch: u32) -> f64 {
        self.ratio * keystone_grams * f64::from(batch)
    }
}
