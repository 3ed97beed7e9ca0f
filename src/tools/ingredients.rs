//! Ingredient MCP Tools
//!
//! Tools for managing ingredients in the database.

use std::collections::BTreeSet;

use rusqlite::Connection;
use serde::Serialize;

use crate::db::Database;
use crate::models::{
    Grouping, GroupingId, Ingredient, IngredientCreate, IngredientUpdate, Nutrient, NutrientProfile,
    MISSING,
};

/// Summary of an ingredient for list/search results
#[derive(Debug, Serialize)]
pub struct IngredientSummary {
    pub id: String,
    pub name: String,
    pub label_text: String,
    pub cost_per_kilo: f64,
    pub groupings: BTreeSet<GroupingId>,
}

impl From<&Ingredient> for IngredientSummary {
    fn from(item: &Ingredient) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            label_text: item.label_text.clone(),
            cost_per_kilo: item.cost_per_kilo,
            groupings: item.groupings.clone(),
        }
    }
}

/// Full ingredient detail response
#[derive(Debug, Serialize)]
pub struct IngredientDetail {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub missing_nutrients: Vec<Nutrient>,
    pub used_in_recipes: Vec<String>,
}

/// Response for search_ingredients
#[derive(Debug, Serialize)]
pub struct SearchIngredientsResponse {
    pub items: Vec<IngredientSummary>,
    pub total: usize,
}

/// Response for list_ingredients
#[derive(Debug, Serialize)]
pub struct ListIngredientsResponse {
    pub items: Vec<IngredientSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for next_ingredient_id
#[derive(Debug, Serialize)]
pub struct NextIngredientIdResponse {
    /// None when every generated id is taken
    pub id: Option<String>,
}

/// Response for delete_ingredient blocked
#[derive(Debug, Serialize)]
pub struct DeleteIngredientBlockedResponse {
    pub error: String,
    pub used_in_recipes: Vec<String>,
}

/// Response for successful delete_ingredient
#[derive(Debug, Serialize)]
pub struct DeleteIngredientSuccessResponse {
    pub success: bool,
    pub deleted_id: String,
}

fn validate_nutrients(nutrients: &NutrientProfile) -> Result<(), String> {
    for nutrient in Nutrient::ALL {
        let value = nutrients.get(nutrient);
        if !value.is_finite() || (value < 0.0 && value != MISSING) {
            return Err(format!(
                "{} must be 0 or more, or {} when unknown",
                nutrient, MISSING
            ));
        }
    }
    Ok(())
}

fn validate_cost(cost: f64) -> Result<(), String> {
    if !cost.is_finite() || cost < 0.0 {
        return Err("cost_per_kilo cannot be negative".to_string());
    }
    Ok(())
}

fn validate_groupings(conn: &Connection, groupings: &BTreeSet<GroupingId>) -> Result<(), String> {
    for grouping in groupings {
        let found = Grouping::get(conn, *grouping).map_err(|e| format!("Database error: {}", e))?;
        if found.is_none() {
            return Err(format!("Grouping {} is not configured", grouping));
        }
    }
    Ok(())
}

fn detail(conn: &Connection, ingredient: Ingredient) -> Result<IngredientDetail, String> {
    let used_in_recipes = Ingredient::get_used_in_recipes(conn, &ingredient.id)
        .map_err(|e| format!("Failed to get recipe usage: {}", e))?;
    Ok(IngredientDetail {
        missing_nutrients: ingredient.nutrients.missing_nutrients(),
        ingredient,
        used_in_recipes,
    })
}

/// Add a new ingredient
pub fn add_ingredient(db: &Database, mut data: IngredientCreate) -> Result<IngredientDetail, String> {
    data.name = data.name.trim().to_string();
    if data.name.is_empty() {
        return Err("Ingredient name cannot be empty".to_string());
    }
    validate_cost(data.cost_per_kilo)?;
    validate_nutrients(&data.nutrients)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if let Some(ref id) = data.id {
        let id = id.trim();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("Ingredient id must be numeric, got '{}'", id));
        }
        let exists = Ingredient::exists(&conn, id).map_err(|e| format!("Database error: {}", e))?;
        if exists {
            return Err(format!("Ingredient id {} is already in use", id));
        }
    }
    validate_groupings(&conn, &data.groupings)?;

    let ingredient = Ingredient::create(&conn, &data)
        .map_err(|e| format!("Failed to create ingredient: {}", e))?;

    let missing = ingredient.nutrients.missing_nutrients();
    if !missing.is_empty() {
        tracing::warn!(id = %ingredient.id, missing = ?missing, "ingredient stored with missing nutrient values");
    }
    detail(&conn, ingredient)
}

/// Get an ingredient by ID with recipe usage
pub fn get_ingredient(db: &Database, id: &str) -> Result<Option<IngredientDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let ingredient = Ingredient::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get ingredient: {}", e))?;

    match ingredient {
        Some(ingredient) => Ok(Some(detail(&conn, ingredient)?)),
        None => Ok(None),
    }
}

/// Search ingredients by name, label text or id
pub fn search_ingredients(db: &Database, query: &str, limit: i64) -> Result<SearchIngredientsResponse, String> {
    let limit = limit.clamp(1, 100);
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let items = Ingredient::search(&conn, query.trim(), limit)
        .map_err(|e| format!("Search failed: {}", e))?;

    let summaries: Vec<IngredientSummary> = items.iter().map(IngredientSummary::from).collect();
    let total = summaries.len();

    Ok(SearchIngredientsResponse {
        items: summaries,
        total,
    })
}

/// List ingredients alphabetically with pagination
pub fn list_ingredients(db: &Database, limit: i64, offset: i64) -> Result<ListIngredientsResponse, String> {
    let limit = limit.clamp(1, 500);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let items = Ingredient::list(&conn, limit, offset)
        .map_err(|e| format!("Failed to list ingredients: {}", e))?;
    let total = Ingredient::count(&conn)
        .map_err(|e| format!("Failed to count ingredients: {}", e))?;

    Ok(ListIngredientsResponse {
        items: items.iter().map(IngredientSummary::from).collect(),
        total,
        limit,
        offset,
    })
}

/// Update an ingredient; its id never changes
pub fn update_ingredient(db: &Database, id: &str, data: IngredientUpdate) -> Result<IngredientDetail, String> {
    if let Some(ref name) = data.name {
        if name.trim().is_empty() {
            return Err("Ingredient name cannot be empty".to_string());
        }
    }
    if let Some(cost) = data.cost_per_kilo {
        validate_cost(cost)?;
    }
    if let Some(ref nutrients) = data.nutrients {
        validate_nutrients(nutrients)?;
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    if let Some(ref groupings) = data.groupings {
        validate_groupings(&conn, groupings)?;
    }

    let updated = Ingredient::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update ingredient: {}", e))?;

    match updated {
        Some(ingredient) => detail(&conn, ingredient),
        None => Err(format!("Ingredient not found with id: {}", id)),
    }
}

/// Delete an ingredient (blocked while any recipe uses it)
pub fn delete_ingredient(
    db: &Database,
    id: &str,
) -> Result<Result<DeleteIngredientSuccessResponse, DeleteIngredientBlockedResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let exists = Ingredient::exists(&conn, id).map_err(|e| format!("Database error: {}", e))?;
    if !exists {
        return Err(format!("Ingredient not found with id: {}", id));
    }

    let used_in_recipes = Ingredient::get_used_in_recipes(&conn, id)
        .map_err(|e| format!("Failed to get recipe usage: {}", e))?;
    if !used_in_recipes.is_empty() {
        return Ok(Err(DeleteIngredientBlockedResponse {
            error: format!("Cannot delete ingredient: used in {} recipe(s)", used_in_recipes.len()),
            used_in_recipes,
        }));
    }

    Ingredient::delete(&conn, id).map_err(|e| format!("Failed to delete ingredient: {}", e))?;

    Ok(Ok(DeleteIngredientSuccessResponse {
        success: true,
        deleted_id: id.to_string(),
    }))
}

/// Lowest unused generated ingredient id
pub fn next_ingredient_id(db: &Database) -> Result<NextIngredientIdResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let id = Ingredient::next_available_id(&conn).map_err(|e| format!("Database error: {}", e))?;
    Ok(NextIngredientIdResponse { id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_db;

    fn oats() -> IngredientCreate {
        IngredientCreate {
            id: None,
            name: " Oats ".into(),
            label_text: "ovesné vločky".into(),
            info: String::new(),
            cost_per_kilo: 2.0,
            nutrients: NutrientProfile::from_values([1500.0, 358.0, 7.0, MISSING, 60.0, 1.0, 13.0, 0.01]),
            groupings: BTreeSet::new(),
        }
    }

    #[test]
    fn test_add_reports_missing_nutrients() {
        let db = test_db();
        let added = add_ingredient(&db, oats()).unwrap();
        assert_eq!(added.ingredient.id, "001");
        assert_eq!(added.ingredient.name, "Oats");
        assert_eq!(added.missing_nutrients, vec![Nutrient::Saturates]);
        assert_eq!(next_ingredient_id(&db).unwrap().id.as_deref(), Some("002"));
    }

    #[test]
    fn test_add_validation() {
        let db = test_db();
        let mut bad = oats();
        bad.nutrients.fat = -2.0;
        assert!(add_ingredient(&db, bad).is_err());

        let mut bad = oats();
        bad.groupings.insert(GroupingId(5));
        assert!(add_ingredient(&db, bad).unwrap_err().contains("Grouping 5"));

        let mut bad = oats();
        bad.id = Some("12a".into());
        assert!(add_ingredient(&db, bad).is_err());

        let mut first = oats();
        first.id = Some("173904".into());
        add_ingredient(&db, first.clone()).unwrap();
        assert!(add_ingredient(&db, first).unwrap_err().contains("already in use"));
    }

    #[test]
    fn test_update_and_delete() {
        let db = test_db();
        add_ingredient(&db, oats()).unwrap();
        let updated = update_ingredient(
            &db,
            "001",
            IngredientUpdate {
                label_text: Some("oves".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.ingredient.label_text, "oves");
        assert!(update_ingredient(&db, "404", IngredientUpdate::default()).is_err());

        let deleted = delete_ingredient(&db, "001").unwrap();
        assert!(deleted.is_ok());
        assert!(get_ingredient(&db, "001").unwrap().is_none());
    }
}
