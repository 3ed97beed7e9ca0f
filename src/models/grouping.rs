//! Grouping model
//!
//! A grouping folds several ingredients into one contents-list entry.
//! Grouping 0 is reserved: its members are left off contents lists entirely.

use std::collections::BTreeMap;

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// Identifier of a grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupingId(pub u32);

impl GroupingId {
    /// Members are excluded from printed contents lists
    pub const HIDDEN: GroupingId = GroupingId(0);

    pub fn is_hidden(&self) -> bool {
        *self == Self::HIDDEN
    }
}

impl std::fmt::Display for GroupingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display text for each configured grouping
pub type GroupingLabels = BTreeMap<GroupingId, String>;

/// A configured grouping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grouping {
    pub id: GroupingId,
    /// Shown in settings only
    pub description: String,
    /// Printed in contents lists in place of the member ingredients
    pub display_text: String,
}

impl Grouping {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: GroupingId(row.get("id")?),
            description: row.get("description")?,
            display_text: row.get("display_text")?,
        })
    }

    /// Insert or replace a grouping's texts
    pub fn upsert(conn: &Connection, grouping: &Grouping) -> DbResult<()> {
        conn.execute(
            r#"
            INSERT INTO groupings (id, description, display_text) VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                description = excluded.description,
                display_text = excluded.display_text
            "#,
            params![grouping.id.0, grouping.description, grouping.display_text],
        )?;
        Ok(())
    }

    pub fn get(conn: &Connection, id: GroupingId) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM groupings WHERE id = ?1")?;
        match stmt.query_row([id.0], Self::from_row) {
            Ok(grouping) => Ok(Some(grouping)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All groupings ordered by id
    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM groupings ORDER BY id ASC")?;
        let groupings = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groupings)
    }

    /// Display texts keyed by id, as consumed by the contents formatter
    pub fn labels(conn: &Connection) -> DbResult<GroupingLabels> {
        Ok(Self::list(conn)?
            .into_iter()
            .map(|g| (g.id, g.display_text))
            .collect())
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

    #[test]
    fn test_upsert_and_labels() {
        let conn = conn();
        Grouping::upsert(
            &conn,
            &Grouping {
                id: GroupingId(1),
                description: "dried fruit".into(),
                display_text: "sušené ovoce".into(),
            },
        )
        .unwrap();
        Grouping::upsert(
            &conn,
            &Grouping {
                id: GroupingId(1),
                description: "dried fruit".into(),
                display_text: "dried fruit".into(),
            },
        )
        .unwrap();

        let labels = Grouping::labels(&conn).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[&GroupingId(1)], "dried fruit");
        assert!(labels.contains_key(&GroupingId::HIDDEN));
    }

    #[test]
    fn test_get_missing_grouping() {
        let conn = conn();
        assert!(Grouping::get(&conn, GroupingId(7)).unwrap().is_none());
        assert!(Grouping::get(&conn, GroupingId::HIDDEN).unwrap().is_some());
    }
}
