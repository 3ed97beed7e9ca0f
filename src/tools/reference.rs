//! Reference Data MCP Tools
//!
//! Search FoodData Central and import its foods as ingredients.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::db::Database;
use crate::models::{GroupingId, IngredientCreate};
use crate::reference::{FdcReference, ReferenceFood, ReferenceHit, ReferenceStatus};
use super::ingredients::{add_ingredient, IngredientDetail};

/// Response for search_reference_foods
#[derive(Debug, Serialize)]
pub struct SearchReferenceResponse {
    pub query: String,
    pub hits: Vec<ReferenceHit>,
    pub total: usize,
}

/// Options for import_reference_food
#[derive(Debug, Clone, Default)]
pub struct ReferenceImport {
    /// Defaults to the FDC description
    pub name: Option<String>,
    pub label_text: String,
    pub cost_per_kilo: f64,
    pub groupings: BTreeSet<GroupingId>,
}

pub fn reference_status(reference: &FdcReference) -> ReferenceStatus {
    reference.status()
}

/// Search reference foods by keywords or FDC id
pub fn search_reference_foods(
    reference: &FdcReference,
    query: &str,
    limit: usize,
) -> Result<SearchReferenceResponse, String> {
    let limit = limit.clamp(1, 200);
    let hits = reference.search(query, limit).map_err(|e| e.to_string())?;
    let total = hits.len();
    Ok(SearchReferenceResponse {
        query: query.to_string(),
        hits,
        total,
    })
}

fn reference_food(reference: &FdcReference, fdc_id: u32) -> Result<ReferenceFood, String> {
    if !reference.is_ready() {
        return Err(reference
            .status()
            .error
            .unwrap_or_else(|| "Reference data is still loading".to_string()));
    }
    reference
        .food(fdc_id)
        .ok_or_else(|| format!("Reference food not found: {}", fdc_id))
}

/// One reference food with its nutrient values
pub fn get_reference_food(reference: &FdcReference, fdc_id: u32) -> Result<ReferenceFood, String> {
    reference_food(reference, fdc_id)
}

/// Create an ingredient whose id is the FDC code
pub fn import_reference_food(
    db: &Database,
    reference: &FdcReference,
    fdc_id: u32,
    options: ReferenceImport,
) -> Result<IngredientDetail, String> {
    let food = reference_food(reference, fdc_id)?;

    let data = IngredientCreate {
        id: Some(fdc_id.to_string()),
        name: options.name.unwrap_or(food.description),
        label_text: options.label_text,
        info: format!("FoodData Central {}", fdc_id),
        cost_per_kilo: options.cost_per_kilo,
        nutrients: food.nutrients,
        groupings: options.groupings,
    };
    let detail = add_ingredient(db, data)?;
    tracing::info!(fdc_id, id = %detail.ingredient.id, "imported reference food");
    Ok(detail)
}
