//! Per-unit weight and cost

use serde::Serialize;

use crate::models::AbsoluteSelection;
use super::aggregate::check_weight;
use super::error::{EngineError, EngineResult};

/// Cost of one unit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitCost {
    Resolved(f64),
    /// Some ingredients carry an unusable cost per kilo
    Unresolved { ingredients: Vec<String> },
}

impl UnitCost {
    /// Flattened value, -1.0 when unresolved
    pub fn value(&self) -> f64 {
        match self {
            UnitCost::Resolved(cost) => *cost,
            UnitCost::Unresolved { .. } => -1.0,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, UnitCost::Resolved(_))
    }

    /// Add a fixed per-unit amount to a resolved cost
    pub fn plus(&self, extra: f64) -> UnitCost {
        match self {
            UnitCost::Resolved(cost) => UnitCost::Resolved(cost + extra),
            unresolved => unresolved.clone(),
        }
    }
}

fn check_units(units: u32) -> EngineResult<f64> {
    if units == 0 {
        return Err(EngineError::InvalidUnitCount);
    }
    Ok(f64::from(units))
}

/// Whole grams in one unit, rounded down
pub fn unit_weight(selections: &[AbsoluteSelection], units: u32) -> EngineResult<u32> {
    let units = check_units(units)?;
    let mut total = 0.0;
    for selection in selections {
        check_weight(selection.ingredient_id(), selection.grams)?;
        total += selection.grams;
    }
    Ok((total / units).floor() as u32)
}

/// Ingredient cost of one unit
pub fn unit_cost(selections: &[AbsoluteSelection], units: u32) -> EngineResult<UnitCost> {
    let units = check_units(units)?;
    let mut total = 0.0;
    let mut unresolved = Vec::new();

    for selection in selections {
        check_weight(selection.ingredient_id(), selection.grams)?;
        let per_kilo = selection.ingredient.cost_per_kilo;
        if !per_kilo.is_finite() || per_kilo < 0.0 {
            if !unresolved.contains(&selection.ingredient.id) {
                unresolved.push(selection.ingredient.id.clone());
            }
            continue;
        }
        total += selection.grams / 1000.0 * per_kilo;
    }

    if !unresolved.is_empty() {
        tracing::warn!(ingredients = ?unresolved, "unit cost unresolved");
        return Ok(UnitCost::Unresolved {
            ingredients: unresolved,
        });
    }
    Ok(UnitCost::Resolved(total / units))
}
