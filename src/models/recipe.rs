//! Recipe model
//!
//! A recipe anchors its selections to one keystone ingredient: the keystone
//! carries the grams in one unit and every other selection is a multiple of it.

use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use crate::engine::resolve::check_keystone_grams;
use crate::engine::{self, EngineError, EngineResult};
use super::{AbsoluteSelection, Ingredient, RatioSelection};

/// A stored recipe
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub title: String,
    keystone: AbsoluteSelection,
    selections: Vec<RatioSelection>,
    /// Name of the label set used when exporting, if any
    pub label_set: Option<String>,
}

/// Listing row for a recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub title: String,
    pub keystone_ingredient_id: String,
    pub keystone_grams: f64,
    pub selection_count: i64,
    pub label_set: Option<String>,
}

fn check_ratio(selection: &RatioSelection) -> EngineResult<()> {
    if !selection.ratio.is_finite() || selection.ratio < 0.0 {
        return Err(EngineError::InvalidWeight {
            ingredient: selection.ingredient.id.clone(),
            grams: selection.ratio,
        });
    }
    Ok(())
}

impl Recipe {
    /// Build a recipe, checking the keystone and selection invariants
    pub fn new(
        title: impl Into<String>,
        keystone: AbsoluteSelection,
        selections: Vec<RatioSelection>,
    ) -> EngineResult<Self> {
        check_keystone_grams(keystone.ingredient_id(), keystone.grams)?;
        let mut recipe = Self {
            title: title.into(),
            keystone,
            selections: Vec::with_capacity(selections.len()),
            label_set: None,
        };
        for selection in selections {
            recipe.add_selection(selection)?;
        }
        Ok(recipe)
    }

    /// Build a recipe from absolute selections around a chosen keystone
    pub fn from_selections(
        title: impl Into<String>,
        selections: &[AbsoluteSelection],
        keystone_id: &str,
        batch: u32,
    ) -> EngineResult<Self> {
        let split = engine::ratios_from_selections(selections, keystone_id, batch)?;
        Self::new(title, split.keystone, split.selections)
    }

    pub fn keystone(&self) -> &AbsoluteSelection {
        &self.keystone
    }

    pub fn selections(&self) -> &[RatioSelection] {
        &self.selections
    }

    pub fn selection(&self, ingredient_id: &str) -> Option<&RatioSelection> {
        self.selections.iter().find(|s| s.ingredient.id == ingredient_id)
    }

    /// Every ingredient in the recipe, keystone last
    pub fn ingredient_ids(&self) -> Vec<&str> {
        self.selections
            .iter()
            .map(|s| s.ingredient_id())
            .chain(std::iter::once(self.keystone.ingredient_id()))
            .collect()
    }

    pub fn add_selection(&mut self, selection: RatioSelection) -> EngineResult<()> {
        check_ratio(&selection)?;
        if selection.ingredient.id == self.keystone.ingredient.id {
            return Err(EngineError::InvalidKeystone(format!(
                "{} is the keystone and cannot also be a ratio selection",
                selection.ingredient.id
            )));
        }
        if self.selection(&selection.ingredient.id).is_some() {
            return Err(EngineError::DuplicateSelection(selection.ingredient.id.clone()));
        }
        self.selections.push(selection);
        Ok(())
    }

    /// Change a selection's ratio and percent flag; false if not selected
    pub fn update_selection(
        &mut self,
        ingredient_id: &str,
        ratio: Option<f64>,
        append_percent: Option<bool>,
    ) -> EngineResult<bool> {
        let Some(selection) = self.selections.iter_mut().find(|s| s.ingredient.id == ingredient_id) else {
            return Ok(false);
        };
        let mut updated = selection.clone();
        if let Some(ratio) = ratio {
            updated.ratio = ratio;
        }
        if let Some(append_percent) = append_percent {
            updated.append_percent = append_percent;
        }
        check_ratio(&updated)?;
        *selection = updated;
        Ok(true)
    }

    pub fn remove_selection(&mut self, ingredient_id: &str) -> bool {
        let before = self.selections.len();
        self.selections.retain(|s| s.ingredient.id != ingredient_id);
        self.selections.len() != before
    }

    pub fn set_keystone_grams(&mut self, grams: f64) -> EngineResult<()> {
        check_keystone_grams(self.keystone.ingredient_id(), grams)?;
        self.keystone.grams = grams;
        Ok(())
    }

    pub fn set_keystone_percent(&mut self, append_percent: bool) {
        self.keystone.append_percent = append_percent;
    }

    /// Absolute selections for `batch` units
    pub fn resolve(&self, batch: u32) -> EngineResult<Vec<AbsoluteSelection>> {
        engine::resolve_recipe(self, batch)
    }

    // ---- persistence ----

    /// Insert or replace a recipe with all of its selections
    pub fn save(conn: &Connection, recipe: &Recipe) -> DbResult<()> {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO recipes (title, keystone_ingredient_id, keystone_grams, keystone_append_percent, label_set)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(title) DO UPDATE SET
                keystone_ingredient_id = excluded.keystone_ingredient_id,
                keystone_grams = excluded.keystone_grams,
                keystone_append_percent = excluded.keystone_append_percent,
                label_set = excluded.label_set,
                updated_at = datetime('now')
            "#,
            params![
                recipe.title,
                recipe.keystone.ingredient.id,
                recipe.keystone.grams,
                recipe.keystone.append_percent as i32,
                recipe.label_set,
            ],
        )?;

        tx.execute("DELETE FROM recipe_selections WHERE recipe_title = ?1", [&recipe.title])?;
        for (position, selection) in recipe.selections.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO recipe_selections (recipe_title, ingredient_id, ratio, append_percent, position)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    recipe.title,
                    selection.ingredient.id,
                    selection.ratio,
                    selection.append_percent as i32,
                    position as i64,
                ],
            )?;
        }
        tx.commit()?;

        tracing::debug!(title = %recipe.title, selections = recipe.selections.len(), "saved recipe");
        Ok(())
    }

    /// Load a recipe, sharing one `Arc<Ingredient>` per ingredient
    pub fn get_by_title(conn: &Connection, title: &str) -> DbResult<Option<Self>> {
        let head = conn
            .query_row(
                r#"
                SELECT keystone_ingredient_id, keystone_grams, keystone_append_percent, label_set
                FROM recipes WHERE title = ?1
                "#,
                [title],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, i32>(2)? != 0,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()?;
        let Some((keystone_id, keystone_grams, keystone_percent, label_set)) = head else {
            return Ok(None);
        };

        let mut cache: HashMap<String, Arc<Ingredient>> = HashMap::new();
        let mut load = |id: &str| -> DbResult<Arc<Ingredient>> {
            if let Some(found) = cache.get(id) {
                return Ok(found.clone());
            }
            let ingredient = Ingredient::get_by_id(conn, id)?.ok_or_else(|| {
                DbError::Integrity(format!("recipe {} references unknown ingredient {}", title, id))
            })?;
            let shared = Arc::new(ingredient);
            cache.insert(id.to_string(), shared.clone());
            Ok(shared)
        };

        let keystone = AbsoluteSelection {
            ingredient: load(&keystone_id)?,
            grams: keystone_grams,
            append_percent: keystone_percent,
        };

        let mut stmt = conn.prepare(
            r#"
            SELECT ingredient_id, ratio, append_percent FROM recipe_selections
            WHERE recipe_title = ?1
            ORDER BY position ASC
            "#,
        )?;
        let rows = stmt
            .query_map([title], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, i32>(2)? != 0,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut selections = Vec::with_capacity(rows.len());
        for (ingredient_id, ratio, append_percent) in rows {
            selections.push(RatioSelection {
                ingredient: load(&ingredient_id)?,
                ratio,
                append_percent,
            });
        }

        let mut recipe = Self::new(title, keystone, selections)
            .map_err(|e| DbError::Integrity(format!("recipe {}: {}", title, e)))?;
        recipe.label_set = label_set;
        Ok(Some(recipe))
    }

    pub fn exists(conn: &Connection, title: &str) -> DbResult<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM recipes WHERE title = ?1",
            [title],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// All recipes ordered by title
    pub fn list(conn: &Connection) -> DbResult<Vec<RecipeSummary>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT r.title, r.keystone_ingredient_id, r.keystone_grams, r.label_set,
                   (SELECT COUNT(*) FROM recipe_selections s WHERE s.recipe_title = r.title)
            FROM recipes r
            ORDER BY r.title COLLATE NOCASE ASC
            "#,
        )?;
        let recipes = stmt
            .query_map([], |row| {
                Ok(RecipeSummary {
                    title: row.get(0)?,
                    keystone_ingredient_id: row.get(1)?,
                    keystone_grams: row.get(2)?,
                    label_set: row.get(3)?,
                    selection_count: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    pub fn list_titles(conn: &Connection) -> DbResult<Vec<String>> {
        Ok(Self::list(conn)?.into_iter().map(|r| r.title).collect())
    }

    /// Point a recipe at a label set, or clear it; false if the recipe is unknown
    pub fn set_label_set(conn: &Connection, title: &str, label_set: Option<&str>) -> DbResult<bool> {
        let rows = conn.execute(
            "UPDATE recipes SET label_set = ?1, updated_at = datetime('now') WHERE title = ?2",
            params![label_set, title],
        )?;
        Ok(rows > 0)
    }

    /// Delete a recipe and its selections
    pub fn delete(conn: &Connection, title: &str) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM recipes WHERE title = ?1", [title])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::{IngredientCreate, NutrientProfile};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn stored(conn: &Connection, id: &str, name: &str) -> Arc<Ingredient> {
        Arc::new(
            Ingredient::create(
                conn,
                &IngredientCreate {
                    id: Some(id.into()),
                    name: name.into(),
                    label_text: name.into(),
                    info: String::new(),
                    cost_per_kilo: 1.0,
                    nutrients: NutrientProfile::zero(),
                    groupings: Default::default(),
                },
            )
            .unwrap(),
        )
    }

    fn porridge(conn: &Connection) -> Recipe {
        let oats = stored(conn, "001", "Oats");
        let milk = stored(conn, "002", "Milk");
        let honey = stored(conn, "003", "Honey");
        Recipe::new(
            "Porridge",
            AbsoluteSelection::new(oats, 60.0).with_percent(),
            vec![
                RatioSelection::new(milk, 2.5),
                RatioSelection::new(honey, 0.1).with_percent(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_keystone_cannot_be_ratio_selection() {
        let conn = conn();
        let mut recipe = porridge(&conn);
        let oats = recipe.keystone().ingredient.clone();
        assert!(matches!(
            recipe.add_selection(RatioSelection::new(oats, 1.0)),
            Err(EngineError::InvalidKeystone(_))
        ));
    }

    #[test]
    fn test_duplicate_selection_rejected() {
        let conn = conn();
        let mut recipe = porridge(&conn);
        let milk = recipe.selections()[0].ingredient.clone();
        assert_eq!(
            recipe.add_selection(RatioSelection::new(milk, 1.0)),
            Err(EngineError::DuplicateSelection("002".into()))
        );
    }

    #[test]
    fn test_invalid_keystone_grams() {
        let conn = conn();
        let oats = stored(&conn, "001", "Oats");
        assert!(matches!(
            Recipe::new("Bad", AbsoluteSelection::new(oats, 0.0), vec![]),
            Err(EngineError::InvalidKeystone(_))
        ));

        let other = self::conn();
        let mut recipe = porridge(&other);
        assert!(recipe.set_keystone_grams(-1.0).is_err());
        assert_eq!(recipe.keystone().grams, 60.0);
    }

    #[test]
    fn test_update_and_remove_selection() {
        let conn = conn();
        let mut recipe = porridge(&conn);
        assert!(recipe.update_selection("002", Some(3.0), Some(true)).unwrap());
        assert_eq!(recipe.selection("002").unwrap().ratio, 3.0);
        assert!(recipe.selection("002").unwrap().append_percent);
        assert!(recipe.update_selection("002", Some(f64::NAN), None).is_err());
        assert_eq!(recipe.selection("002").unwrap().ratio, 3.0);
        assert!(!recipe.update_selection("404", Some(1.0), None).unwrap());

        assert!(recipe.remove_selection("003"));
        assert!(!recipe.remove_selection("003"));
        assert_eq!(recipe.ingredient_ids(), vec!["002", "001"]);
    }

    #[test]
    fn test_save_and_load_share_ingredients() {
        let conn = conn();
        let recipe = porridge(&conn);
        Recipe::save(&conn, &recipe).unwrap();

        let loaded = Recipe::get_by_title(&conn, "Porridge").unwrap().unwrap();
        assert_eq!(loaded.keystone().grams, 60.0);
        assert!(loaded.keystone().append_percent);
        let ids: Vec<_> = loaded.selections().iter().map(|s| s.ingredient_id()).collect();
        assert_eq!(ids, vec!["002", "003"]);
        assert_eq!(loaded.selections()[1].ratio, 0.1);
        assert!(Recipe::get_by_title(&conn, "Gruel").unwrap().is_none());
    }

    #[test]
    fn test_save_replaces_selections() {
        let conn = conn();
        let mut recipe = porridge(&conn);
        Recipe::save(&conn, &recipe).unwrap();
        recipe.remove_selection("002");
        Recipe::save(&conn, &recipe).unwrap();

        let loaded = Recipe::get_by_title(&conn, "Porridge").unwrap().unwrap();
        assert_eq!(loaded.selections().len(), 1);
        let summaries = Recipe::list(&conn).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].selection_count, 1);
    }

    #[test]
    fn test_ingredient_delete_refused_while_used() {
        let conn = conn();
        Recipe::save(&conn, &porridge(&conn)).unwrap();
        assert_eq!(Ingredient::get_used_in_recipes(&conn, "003").unwrap(), vec!["Porridge"]);
        assert!(Ingredient::delete(&conn, "003").is_err());

        assert!(Recipe::delete(&conn, "Porridge").unwrap());
        assert!(Ingredient::delete(&conn, "003").unwrap());
    }

    #[test]
    fn test_resolve_stored_recipe() {
        let conn = conn();
        Recipe::save(&conn, &porridge(&conn)).unwrap();
        let loaded = Recipe::get_by_title(&conn, "Porridge").unwrap().unwrap();
        let resolved = loaded.resolve(2).unwrap();
        let grams: Vec<f64> = resolved.iter().map(|s| s.grams).collect();
        assert_eq!(grams, vec![300.0, 12.0, 120.0]);
    }
}
