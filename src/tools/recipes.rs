//! Recipe MCP Tools
//!
//! Tools for creating recipes from weighed selections and editing their ratios.

use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::Connection;
use serde::Serialize;

use crate::db::Database;
use crate::engine;
use crate::models::{AbsoluteSelection, Ingredient, LabelSet, RatioSelection, Recipe, RecipeSummary};

/// One weighed ingredient as supplied by a caller
#[derive(Debug, Clone)]
pub struct SelectionSpec {
    pub ingredient_id: String,
    pub grams: f64,
    pub append_percent: bool,
}

/// Keystone of a recipe
#[derive(Debug, Serialize)]
pub struct KeystoneView {
    pub ingredient_id: String,
    pub ingredient_name: String,
    /// Grams in one unit
    pub grams: f64,
    pub append_percent: bool,
}

/// Ratio selection of a recipe
#[derive(Debug, Serialize)]
pub struct RatioView {
    pub ingredient_id: String,
    pub ingredient_name: String,
    pub ratio: f64,
    /// Grams in one unit
    pub grams: f64,
    pub append_percent: bool,
}

/// Full recipe detail response
#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub title: String,
    pub label_set: Option<String>,
    pub keystone: KeystoneView,
    pub selections: Vec<RatioView>,
    /// Grams in one unit across every selection
    pub unit_grams: f64,
}

impl From<&Recipe> for RecipeDetail {
    fn from(recipe: &Recipe) -> Self {
        let keystone = recipe.keystone();
        let selections: Vec<RatioView> = recipe
            .selections()
            .iter()
            .map(|s| RatioView {
                ingredient_id: s.ingredient.id.clone(),
                ingredient_name: s.ingredient.name.clone(),
                ratio: s.ratio,
                grams: s.grams_for(keystone.grams, 1),
                append_percent: s.append_percent,
            })
            .collect();
        let unit_grams = keystone.grams + selections.iter().map(|s| s.grams).sum::<f64>();

        Self {
            title: recipe.title.clone(),
            label_set: recipe.label_set.clone(),
            keystone: KeystoneView {
                ingredient_id: keystone.ingredient.id.clone(),
                ingredient_name: keystone.ingredient.name.clone(),
                grams: keystone.grams,
                append_percent: keystone.append_percent,
            },
            selections,
            unit_grams,
        }
    }
}

/// Response for list_recipes
#[derive(Debug, Serialize)]
pub struct ListRecipesResponse {
    pub recipes: Vec<RecipeSummary>,
    pub total: usize,
}

/// One resolved selection
#[derive(Debug, Serialize)]
pub struct ResolvedSelectionView {
    pub ingredient_id: String,
    pub ingredient_name: String,
    pub grams: f64,
    pub append_percent: bool,
}

/// Response for resolve_recipe
#[derive(Debug, Serialize)]
pub struct ResolvedRecipeResponse {
    pub title: String,
    pub batch: u32,
    pub selections: Vec<ResolvedSelectionView>,
    pub total_grams: f64,
}

/// Response for delete_recipe
#[derive(Debug, Serialize)]
pub struct DeleteRecipeResponse {
    pub success: bool,
    pub deleted_title: String,
}

/// Look up the ingredients of caller-supplied selections
///
/// Repeated ids share one `Arc<Ingredient>`.
pub(crate) fn load_selections(conn: &Connection, specs: &[SelectionSpec]) -> Result<Vec<AbsoluteSelection>, String> {
    let mut cache: HashMap<&str, Arc<Ingredient>> = HashMap::new();
    let mut selections = Vec::with_capacity(specs.len());

    for spec in specs {
        let ingredient = match cache.get(spec.ingredient_id.as_str()) {
            Some(found) => found.clone(),
            None => {
                let ingredient = Ingredient::get_by_id(conn, &spec.ingredient_id)
                    .map_err(|e| format!("Failed to get ingredient: {}", e))?
                    .ok_or_else(|| format!("Ingredient not found with id: {}", spec.ingredient_id))?;
                let shared = Arc::new(ingredient);
                cache.insert(spec.ingredient_id.as_str(), shared.clone());
                shared
            }
        };
        selections.push(AbsoluteSelection {
            ingredient,
            grams: spec.grams,
            append_percent: spec.append_percent,
        });
    }
    Ok(selections)
}

fn load_recipe(conn: &Connection, title: &str) -> Result<Recipe, String> {
    Recipe::get_by_title(conn, title)
        .map_err(|e| format!("Failed to get recipe: {}", e))?
        .ok_or_else(|| format!("Recipe not found: {}", title))
}

fn check_label_set(conn: &Connection, name: &str) -> Result<(), String> {
    let found = LabelSet::get(conn, name).map_err(|e| format!("Database error: {}", e))?;
    if found.is_none() {
        return Err(format!("Label set not found: {}", name));
    }
    Ok(())
}

/// Load, change and save a recipe
fn modify_recipe<F>(db: &Database, title: &str, change: F) -> Result<RecipeDetail, String>
where
    F: FnOnce(&Connection, &mut Recipe) -> Result<(), String>,
{
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let mut recipe = load_recipe(&conn, title)?;
    change(&conn, &mut recipe)?;
    Recipe::save(&conn, &recipe).map_err(|e| format!("Failed to save recipe: {}", e))?;
    Ok(RecipeDetail::from(&recipe))
}

/// Create a recipe from absolute grams for `batch` units
///
/// Without an explicit keystone the first selection flagged for a
/// percentage is used.
pub fn create_recipe_from_selections(
    db: &Database,
    title: &str,
    specs: &[SelectionSpec],
    keystone_id: Option<&str>,
    batch: u32,
    label_set: Option<&str>,
) -> Result<RecipeDetail, String> {
    let title = title.trim();
    if title.is_empty() {
        return Err("Recipe title cannot be empty".to_string());
    }
    if specs.is_empty() {
        return Err("A recipe needs at least one selection".to_string());
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let exists = Recipe::exists(&conn, title).map_err(|e| format!("Database error: {}", e))?;
    if exists {
        return Err(format!("Recipe already exists: {}", title));
    }
    if let Some(name) = label_set {
        check_label_set(&conn, name)?;
    }

    let selections = load_selections(&conn, specs)?;
    let keystone_id = match keystone_id {
        Some(id) => id.to_string(),
        None => engine::suggest_keystone(&selections)
            .map(|s| s.ingredient_id().to_string())
            .ok_or_else(|| "No keystone given and no selection is flagged for a percentage".to_string())?,
    };

    let mut recipe = Recipe::from_selections(title, &selections, &keystone_id, batch)
        .map_err(|e| e.to_string())?;
    recipe.label_set = label_set.map(str::to_string);

    Recipe::save(&conn, &recipe).map_err(|e| format!("Failed to save recipe: {}", e))?;
    tracing::info!(title = %recipe.title, keystone = %keystone_id, "created recipe");
    Ok(RecipeDetail::from(&recipe))
}

/// Get a recipe by title
pub fn get_recipe(db: &Database, title: &str) -> Result<Option<RecipeDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let recipe = Recipe::get_by_title(&conn, title).map_err(|e| format!("Failed to get recipe: {}", e))?;
    Ok(recipe.as_ref().map(RecipeDetail::from))
}

/// List all recipes
pub fn list_recipes(db: &Database) -> Result<ListRecipesResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let recipes = Recipe::list(&conn).map_err(|e| format!("Failed to list recipes: {}", e))?;
    let total = recipes.len();
    Ok(ListRecipesResponse { recipes, total })
}

/// Add an ingredient as a ratio of the keystone
pub fn add_recipe_selection(
    db: &Database,
    title: &str,
    ingredient_id: &str,
    ratio: f64,
    append_percent: bool,
) -> Result<RecipeDetail, String> {
    modify_recipe(db, title, |conn, recipe| {
        let ingredient = Ingredient::get_by_id(conn, ingredient_id)
            .map_err(|e| format!("Failed to get ingredient: {}", e))?
            .ok_or_else(|| format!("Ingredient not found with id: {}", ingredient_id))?;
        let mut selection = RatioSelection::new(Arc::new(ingredient), ratio);
        selection.append_percent = append_percent;
        recipe.add_selection(selection).map_err(|e| e.to_string())
    })
}

/// Change the ratio or percent flag of a selection
pub fn update_recipe_selection(
    db: &Database,
    title: &str,
    ingredient_id: &str,
    ratio: Option<f64>,
    append_percent: Option<bool>,
) -> Result<RecipeDetail, String> {
    modify_recipe(db, title, |_, recipe| {
        let found = recipe
            .update_selection(ingredient_id, ratio, append_percent)
            .map_err(|e| e.to_string())?;
        if !found {
            return Err(format!("Ingredient {} is not a selection of {}", ingredient_id, title));
        }
        Ok(())
    })
}

/// Change the keystone's grams per unit or percent flag
pub fn update_recipe_keystone(
    db: &Database,
    title: &str,
    grams: Option<f64>,
    append_percent: Option<bool>,
) -> Result<RecipeDetail, String> {
    modify_recipe(db, title, |_, recipe| {
        if let Some(grams) = grams {
            recipe.set_keystone_grams(grams).map_err(|e| e.to_string())?;
        }
        if let Some(append_percent) = append_percent {
            recipe.set_keystone_percent(append_percent);
        }
        Ok(())
    })
}

/// Remove a ratio selection
pub fn remove_recipe_selection(db: &Database, title: &str, ingredient_id: &str) -> Result<RecipeDetail, String> {
    modify_recipe(db, title, |_, recipe| {
        if recipe.keystone().ingredient_id() == ingredient_id {
            return Err("The keystone cannot be removed from its recipe".to_string());
        }
        if !recipe.remove_selection(ingredient_id) {
            return Err(format!("Ingredient {} is not a selection of {}", ingredient_id, title));
        }
        Ok(())
    })
}

/// Attach a label set to a recipe, or detach it with `None`
pub fn set_recipe_label_set(db: &Database, title: &str, label_set: Option<&str>) -> Result<RecipeDetail, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    if let Some(name) = label_set {
        check_label_set(&conn, name)?;
    }
    let updated = Recipe::set_label_set(&conn, title, label_set)
        .map_err(|e| format!("Failed to update recipe: {}", e))?;
    if !updated {
        return Err(format!("Recipe not found: {}", title));
    }
    Ok(RecipeDetail::from(&load_recipe(&conn, title)?))
}

/// Delete a recipe
pub fn delete_recipe(db: &Database, title: &str) -> Result<DeleteRecipeResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let deleted = Recipe::delete(&conn, title).map_err(|e| format!("Failed to delete recipe: {}", e))?;
    if !deleted {
        return Err(format!("Recipe not found: {}", title));
    }
    Ok(DeleteRecipeResponse {
        success: true,
        deleted_title: title.to_string(),
    })
}

/// Absolute grams of every ingredient for `batch` units
pub fn resolve_recipe(db: &Database, title: &str, batch: u32) -> Result<ResolvedRecipeResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let recipe = load_recipe(&conn, title)?;
    let resolved = recipe.resolve(batch).map_err(|e| e.to_string())?;

    let selections: Vec<ResolvedSelectionView> = resolved
        .iter()
        .map(|s| ResolvedSelectionView {
            ingredient_id: s.ingredient.id.clone(),
            ingredient_name: s.ingredient.name.clone(),
            grams: s.grams,
            append_percent: s.append_percent,
        })
        .collect();
    let total_grams = selections.iter().map(|s| s.grams).sum();

    Ok(ResolvedRecipeResponse {
        title: recipe.title,
        batch,
        selections,
        total_grams,
    })
}
