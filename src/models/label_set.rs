//! Label set model
//!
//! Named label templates: the fixed texts wrapped around calculated output.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

fn default_days_to_expiry() -> u32 {
    1
}

/// A label template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSet {
    pub name: String,
    #[serde(default)]
    pub main_title: String,
    #[serde(default)]
    pub sub_title: String,
    #[serde(default)]
    pub contents_prefix: String,
    #[serde(default)]
    pub nutrition_prefix: String,
    /// Footer text; `%WEIGHT%` is replaced by the unit weight
    #[serde(default)]
    pub additional_info: String,
    #[serde(default = "default_days_to_expiry")]
    pub days_to_expiry: u32,
    /// Printed in place of the calculated unit weight when set
    #[serde(default)]
    pub unit_weight_override: Option<u32>,
}

impl LabelSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            main_title: String::new(),
            sub_title: String::new(),
            contents_prefix: String::new(),
            nutrition_prefix: String::new(),
            additional_info: String::new(),
            days_to_expiry: default_days_to_expiry(),
            unit_weight_override: None,
        }
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            main_title: row.get("main_title")?,
            sub_title: row.get("sub_title")?,
            contents_prefix: row.get("contents_prefix")?,
            nutrition_prefix: row.get("nutrition_prefix")?,
            additional_info: row.get("additional_info")?,
            days_to_expiry: row.get("days_to_expiry")?,
            unit_weight_override: row.get("unit_weight_override")?,
        })
    }

    /// Insert or update by name
    pub fn save(conn: &Connection, set: &LabelSet) -> DbResult<()> {
        conn.execute(
            r#"
            INSERT INTO label_sets (
                name, main_title, sub_title, contents_prefix, nutrition_prefix,
                additional_info, days_to_expiry, unit_weight_override
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(name) DO UPDATE SET
                main_title = excluded.main_title,
                sub_title = excluded.sub_title,
                contents_prefix = excluded.contents_prefix,
                nutrition_prefix = excluded.nutrition_prefix,
                additional_info = excluded.additional_info,
                days_to_expiry = excluded.days_to_expiry,
                unit_weight_override = excluded.unit_weight_override,
                updated_at = datetime('now')
            "#,
            params![
                set.name,
                set.main_title,
                set.sub_title,
                set.contents_prefix,
                set.nutrition_prefix,
                set.additional_info,
                set.days_to_expiry,
                set.unit_weight_override,
            ],
        )?;
        Ok(())
    }

    pub fn get(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM label_sets WHERE name = ?1")?;
        match stmt.query_row([name], Self::from_row) {
            Ok(set) => Ok(Some(set)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All label sets sorted by name
    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM label_sets ORDER BY name COLLATE NOCASE ASC")?;
        let sets = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sets)
    }

    /// Delete a label set, clearing it from every recipe that used it
    ///
    /// Returns the number of recipes that lost their label set, or None if
    /// no such set exists.
    pub fn delete(conn: &Connection, name: &str) -> DbResult<Option<usize>> {
        let tx = conn.unchecked_transaction()?;
        let cleared = tx.execute(
            "UPDATE recipes SET label_set = NULL, updated_at = datetime('now') WHERE label_set = ?1",
            [name],
        )?;
        let rows = tx.execute("DELETE FROM label_sets WHERE name = ?1", [name])?;
        if rows == 0 {
            // nothing to delete, keep recipes untouched
            tx.rollback()?;
            return Ok(None);
        }
        tx.commit()?;
        Ok(Some(cleared))
    }
}
