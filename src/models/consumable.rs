//! Consumable model
//!
//! Packaging items such as cups and lids, priced per purchased sample.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// A packaging item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consumable {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Price paid for one sample
    pub cost_per_sample: f64,
    /// Number of items in one sample
    pub sample_size: u32,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a consumable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumableCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cost_per_sample: f64,
    pub sample_size: u32,
}

/// Data for updating a consumable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsumableUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cost_per_sample: Option<f64>,
    pub sample_size: Option<u32>,
}

impl Consumable {
    /// Cost of a single item
    pub fn unit_cost(&self) -> f64 {
        if self.sample_size == 0 {
            return 0.0;
        }
        self.cost_per_sample / f64::from(self.sample_size)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            cost_per_sample: row.get("cost_per_sample")?,
            sample_size: row.get("sample_size")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(conn: &Connection, data: &ConsumableCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO consumables (name, description, cost_per_sample, sample_size)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![data.name, data.description, data.cost_per_sample, data.sample_size],
        )?;
        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or_else(|| rusqlite::Error::QueryReturnedNoRows.into())
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM consumables WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM consumables ORDER BY name COLLATE NOCASE ASC")?;
        let items = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn update(conn: &Connection, id: i64, data: &ConsumableUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = data.name {
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.clone()));
        }
        if let Some(ref description) = data.description {
            updates.push(format!("description = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(description.clone()));
        }
        if let Some(cost) = data.cost_per_sample {
            updates.push(format!("cost_per_sample = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(cost));
        }
        if let Some(size) = data.sample_size {
            updates.push(format!("sample_size = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(size));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());
        let sql = format!(
            "UPDATE consumables SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM consumables WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Packaging cost of one product unit, one of each consumable
    pub fn combined_unit_cost(conn: &Connection) -> DbResult<f64> {
        Ok(Self::list(conn)?.iter().map(Consumable::unit_cost).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn cups() -> ConsumableCreate {
        ConsumableCreate {
            name: "Cup 300 ml".into(),
            description: "PET with lid".into(),
            cost_per_sample: 50.0,
            sample_size: 100,
        }
    }

    #[test]
    fn test_unit_cost() {
        let conn = conn();
        let cup = Consumable::create(&conn, &cups()).unwrap();
        assert_eq!(cup.unit_cost(), 0.5);

        Consumable::create(
            &conn,
            &ConsumableCreate {
                name: "Label".into(),
                description: String::new(),
                cost_per_sample: 10.0,
                sample_size: 40,
            },
        )
        .unwrap();
        assert!((Consumable::combined_unit_cost(&conn).unwrap() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_update_and_delete() {
        let conn = conn();
        let cup = Consumable::create(&conn, &cups()).unwrap();
        let updated = Consumable::update(
            &conn,
            cup.id,
            &ConsumableUpdate {
                sample_size: Some(50),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(updated.unit_cost(), 1.0);
        assert_eq!(updated.name, "Cup 300 ml");

        assert!(Consumable::delete(&conn, cup.id).unwrap());
        assert!(Consumable::get_by_id(&conn, cup.id).unwrap().is_none());
        assert_eq!(Consumable::combined_unit_cost(&conn).unwrap(), 0.0);
    }

    #[test]
    fn test_zero_sample_size_rejected() {
        let conn = conn();
        let mut bad = cups();
        bad.sample_size = 0;
        assert!(Consumable::create(&conn, &bad).is_err());
    }
}
