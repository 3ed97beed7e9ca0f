//! Scaling engine
//!
//! Pure calculations over resolved selections: nutrient aggregation,
//! contents lists, recipe ratios and per-unit figures.

pub mod aggregate;
pub mod contents;
pub mod error;
pub mod resolve;
pub mod unit;

pub use aggregate::{aggregate_nutrients, Aggregate};
pub use contents::{build_contents, contents_text, ContentsEntry, ContentsList};
pub use error::{EngineError, EngineResult, MissingNutrient};
pub use resolve::{ratios_from_selections, resolve_recipe, suggest_keystone, RatioSplit};
pub use unit::{unit_cost, unit_weight, UnitCost};

use serde::Serialize;

use crate::models::{AbsoluteSelection, GroupingLabels, NutrientProfile};

/// Per-unit figures for one unit count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitFigures {
    pub units: u32,
    pub weight: u32,
    pub cost: UnitCost,
}

/// Everything a label needs from the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelFigures {
    pub nutrients: NutrientProfile,
    pub total_grams: f64,
    pub contents: ContentsList,
    pub unit: Option<UnitFigures>,
    pub missing: Vec<MissingNutrient>,
}

/// Run every calculation over one set of absolute selections
pub fn compute_label(
    selections: &[AbsoluteSelection],
    groupings: &GroupingLabels,
    units: Option<u32>,
) -> EngineResult<LabelFigures> {
    let aggregate = aggregate_nutrients(selections)?;
    let contents = build_contents(selections, groupings)?;

    let unit = match units {
        Some(units) => Some(UnitFigures {
            units,
            weight: unit_weight(selections, units)?,
            cost: unit_cost(selections, units)?,
        }),
        None => None,
    };

    Ok(LabelFigures {
        nutrients: aggregate.profile,
        total_grams: aggregate.total_grams,
        contents,
        unit,
        missing: aggregate.missing,
    })
}
