//! Ingredient model
//!
//! An ingredient with cost, nutrient values and contents-list grouping.

use std::collections::BTreeSet;

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::{GroupingId, NutrientProfile};

/// Highest internally generated id
const MAX_GENERATED_ID: u32 = 999;

/// An ingredient
///
/// The id is either a 6-digit FoodData Central code or a generated 3-digit
/// code, and never changes once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    /// Printed verbatim in contents lists; may be empty
    pub label_text: String,
    pub info: String,
    pub cost_per_kilo: f64,
    pub nutrients: NutrientProfile,
    pub groupings: BTreeSet<GroupingId>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new ingredient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientCreate {
    /// Generated when absent
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub label_text: String,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub cost_per_kilo: f64,
    pub nutrients: NutrientProfile,
    #[serde(default)]
    pub groupings: BTreeSet<GroupingId>,
}

/// Data for updating an ingredient
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientUpdate {
    pub name: Option<String>,
    pub label_text: Option<String>,
    pub info: Option<String>,
    pub cost_per_kilo: Option<f64>,
    pub nutrients: Option<NutrientProfile>,
    pub groupings: Option<BTreeSet<GroupingId>>,
}

impl Ingredient {
    /// Build an ingredient that has not been stored yet
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        label_text: impl Into<String>,
        cost_per_kilo: f64,
        nutrients: NutrientProfile,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            label_text: label_text.into(),
            info: String::new(),
            cost_per_kilo,
            nutrients,
            groupings: BTreeSet::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    pub fn with_grouping(mut self, grouping: GroupingId) -> Self {
        self.groupings.insert(grouping);
        self
    }

    /// Left off printed contents lists
    pub fn is_hidden(&self) -> bool {
        self.groupings.contains(&GroupingId::HIDDEN)
    }

    /// The grouping this ingredient folds into, lowest id first
    pub fn display_grouping(&self) -> Option<GroupingId> {
        self.groupings.iter().copied().find(|g| !g.is_hidden())
    }

    /// Whether the contents list needs this ingredient's label text
    pub fn needs_label_text(&self) -> bool {
        !self.is_hidden() && self.display_grouping().is_none()
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            label_text: row.get("label_text")?,
            info: row.get("info")?,
            cost_per_kilo: row.get("cost_per_kilo")?,
            nutrients: NutrientProfile {
                energy_kj: row.get("energy_kj")?,
                energy_kcal: row.get("energy_kcal")?,
                fat: row.get("fat")?,
                saturates: row.get("saturates")?,
                carbohydrates: row.get("carbohydrates")?,
                sugars: row.get("sugars")?,
                protein: row.get("protein")?,
                salt: row.get("salt")?,
            },
            groupings: BTreeSet::new(),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn load_groupings(conn: &Connection, id: &str) -> DbResult<BTreeSet<GroupingId>> {
        let mut stmt = conn.prepare(
            "SELECT grouping_id FROM ingredient_groupings WHERE ingredient_id = ?1",
        )?;
        let groupings = stmt
            .query_map([id], |row| Ok(GroupingId(row.get(0)?)))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(groupings)
    }

    fn store_groupings(conn: &Connection, id: &str, groupings: &BTreeSet<GroupingId>) -> DbResult<()> {
        conn.execute("DELETE FROM ingredient_groupings WHERE ingredient_id = ?1", [id])?;
        for grouping in groupings {
            conn.execute(
                "INSERT INTO ingredient_groupings (ingredient_id, grouping_id) VALUES (?1, ?2)",
                params![id, grouping.0],
            )?;
        }
        Ok(())
    }

    fn with_groupings(conn: &Connection, mut ingredient: Self) -> DbResult<Self> {
        ingredient.groupings = Self::load_groupings(conn, &ingredient.id)?;
        Ok(ingredient)
    }

    /// Insert a new ingredient, generating an id when none is given
    pub fn create(conn: &Connection, data: &IngredientCreate) -> DbResult<Self> {
        let id = match &data.id {
            Some(id) => id.trim().to_string(),
            None => Self::next_available_id(conn)?.ok_or_else(|| {
                DbError::Integrity(format!("all ids up to {:03} are in use", MAX_GENERATED_ID))
            })?,
        };

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO ingredients (
                id, name, label_text, info, cost_per_kilo,
                energy_kj, energy_kcal, fat, saturates, carbohydrates, sugars, protein, salt
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                id,
                data.name,
                data.label_text,
                data.info,
                data.cost_per_kilo,
                data.nutrients.energy_kj,
                data.nutrients.energy_kcal,
                data.nutrients.fat,
                data.nutrients.saturates,
                data.nutrients.carbohydrates,
                data.nutrients.sugars,
                data.nutrients.protein,
                data.nutrients.salt,
            ],
        )?;
        Self::store_groupings(&tx, &id, &data.groupings)?;
        tx.commit()?;

        tracing::debug!(id = %id, name = %data.name, "created ingredient");
        Self::get_by_id(conn, &id)?
            .ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Get an ingredient by id
    pub fn get_by_id(conn: &Connection, id: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM ingredients WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(item) => Ok(Some(Self::with_groupings(conn, item)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(conn: &Connection, id: &str) -> DbResult<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM ingredients WHERE id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Search by name, label text or id
    pub fn search(conn: &Connection, query: &str, limit: i64) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", query);
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM ingredients
            WHERE name LIKE ?1 OR label_text LIKE ?1 OR id LIKE ?1
            ORDER BY name COLLATE NOCASE ASC
            LIMIT ?2
            "#,
        )?;
        let items = stmt
            .query_map(params![pattern, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        items.into_iter().map(|i| Self::with_groupings(conn, i)).collect()
    }

    /// List ingredients alphabetically, ignoring case
    pub fn list(conn: &Connection, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM ingredients ORDER BY name COLLATE NOCASE ASC LIMIT ?1 OFFSET ?2",
        )?;
        let items = stmt
            .query_map(params![limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        items.into_iter().map(|i| Self::with_groupings(conn, i)).collect()
    }

    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM ingredients", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Update an ingredient; the id itself cannot change
    pub fn update(conn: &Connection, id: &str, data: &IngredientUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        macro_rules! add_update {
            ($value:expr, $col:expr) => {
                if let Some(ref val) = $value {
                    updates.push(format!("{} = ?{}", $col, params_vec.len() + 1));
                    params_vec.push(Box::new(val.clone()));
                }
            };
        }

        add_update!(data.name, "name");
        add_update!(data.label_text, "label_text");
        add_update!(data.info, "info");
        add_update!(data.cost_per_kilo, "cost_per_kilo");
        if let Some(ref n) = data.nutrients {
            add_update!(Some(n.energy_kj), "energy_kj");
            add_update!(Some(n.energy_kcal), "energy_kcal");
            add_update!(Some(n.fat), "fat");
            add_update!(Some(n.saturates), "saturates");
            add_update!(Some(n.carbohydrates), "carbohydrates");
            add_update!(Some(n.sugars), "sugars");
            add_update!(Some(n.protein), "protein");
            add_update!(Some(n.salt), "salt");
        }

        if !Self::exists(conn, id)? {
            return Ok(None);
        }

        let tx = conn.unchecked_transaction()?;
        if !updates.is_empty() {
            updates.push("updated_at = datetime('now')".to_string());
            let sql = format!(
                "UPDATE ingredients SET {} WHERE id = ?{}",
                updates.join(", "),
                params_vec.len() + 1
            );
            params_vec.push(Box::new(id.to_string()));
            let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
            tx.execute(&sql, params_refs.as_slice())?;
        }
        if let Some(ref groupings) = data.groupings {
            Self::store_groupings(&tx, id, groupings)?;
        }
        tx.commit()?;

        Self::get_by_id(conn, id)
    }

    /// Titles of recipes using this ingredient, as keystone or selection
    pub fn get_used_in_recipes(conn: &Connection, id: &str) -> DbResult<Vec<String>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT title FROM recipes WHERE keystone_ingredient_id = ?1
            UNION
            SELECT recipe_title FROM recipe_selections WHERE ingredient_id = ?1
            ORDER BY 1
            "#,
        )?;
        let titles = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(titles)
    }

    /// Delete an ingredient
    ///
    /// Fails with a foreign key error while a recipe still uses it.
    /// Returns Ok(false) if not found.
    pub fn delete(conn: &Connection, id: &str) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM ingredients WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Lowest unused generated id
    pub fn next_available_id(conn: &Connection) -> DbResult<Option<String>> {
        let mut stmt = conn.prepare("SELECT id FROM ingredients")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(next_available_id(ids.iter().map(String::as_str)))
    }
}

/// Lowest free id in "001".."999", ignoring registry codes
pub fn next_available_id<'a>(existing: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let taken: BTreeSet<&str> = existing.into_iter().filter(|id| id.len() < 4).collect();
    (1..=MAX_GENERATED_ID)
        .map(|n| format!("{:03}", n))
        .find(|candidate| !taken.contains(candidate.as_str()))
}
