//! Settings MCP Tools
//!
//! Label sets, groupings and packaging consumables.

use serde::Serialize;

use crate::db::Database;
use crate::models::{Consumable, ConsumableCreate, ConsumableUpdate, Grouping, GroupingId, LabelSet};

/// Response for list_label_sets
#[derive(Debug, Serialize)]
pub struct ListLabelSetsResponse {
    pub label_sets: Vec<LabelSet>,
    pub total: usize,
}

/// Response for delete_label_set
#[derive(Debug, Serialize)]
pub struct DeleteLabelSetResponse {
    pub success: bool,
    pub deleted_name: String,
    /// Recipes that no longer reference a label set
    pub recipes_detached: usize,
}

/// Response for list_groupings
#[derive(Debug, Serialize)]
pub struct ListGroupingsResponse {
    pub groupings: Vec<Grouping>,
}

/// Consumable with its per-item cost
#[derive(Debug, Serialize)]
pub struct ConsumableView {
    #[serde(flatten)]
    pub consumable: Consumable,
    pub unit_cost: f64,
}

impl From<Consumable> for ConsumableView {
    fn from(consumable: Consumable) -> Self {
        Self {
            unit_cost: consumable.unit_cost(),
            consumable,
        }
    }
}

/// Response for list_consumables
#[derive(Debug, Serialize)]
pub struct ListConsumablesResponse {
    pub consumables: Vec<ConsumableView>,
    /// Packaging cost of one product unit
    pub combined_unit_cost: f64,
}

/// Response for delete_consumable
#[derive(Debug, Serialize)]
pub struct DeleteConsumableResponse {
    pub success: bool,
    pub deleted_id: i64,
}

// --- Label sets ---

/// Create or replace a label set
pub fn save_label_set(db: &Database, mut set: LabelSet) -> Result<LabelSet, String> {
    set.name = set.name.trim().to_string();
    if set.name.is_empty() {
        return Err("Label set name cannot be empty".to_string());
    }
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    LabelSet::save(&conn, &set).map_err(|e| format!("Failed to save label set: {}", e))?;
    LabelSet::get(&conn, &set.name)
        .map_err(|e| format!("Failed to get label set: {}", e))?
        .ok_or_else(|| format!("Label set not found: {}", set.name))
}

pub fn get_label_set(db: &Database, name: &str) -> Result<Option<LabelSet>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    LabelSet::get(&conn, name).map_err(|e| format!("Failed to get label set: {}", e))
}

pub fn list_label_sets(db: &Database) -> Result<ListLabelSetsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let label_sets = LabelSet::list(&conn).map_err(|e| format!("Failed to list label sets: {}", e))?;
    let total = label_sets.len();
    Ok(ListLabelSetsResponse { label_sets, total })
}

/// Delete a label set and detach it from recipes
pub fn delete_label_set(db: &Database, name: &str) -> Result<DeleteLabelSetResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let detached = LabelSet::delete(&conn, name)
        .map_err(|e| format!("Failed to delete label set: {}", e))?
        .ok_or_else(|| format!("Label set not found: {}", name))?;
    if detached > 0 {
        tracing::info!(name, recipes = detached, "detached deleted label set from recipes");
    }
    Ok(DeleteLabelSetResponse {
        success: true,
        deleted_name: name.to_string(),
        recipes_detached: detached,
    })
}

// --- Groupings ---

/// Create or update a grouping's texts
pub fn set_grouping(db: &Database, id: u32, description: &str, display_text: &str) -> Result<Grouping, String> {
    let id = GroupingId(id);
    if !id.is_hidden() && display_text.trim().is_empty() {
        return Err(format!("Grouping {} needs a display text", id));
    }
    let grouping = Grouping {
        id,
        description: description.to_string(),
        display_text: display_text.to_string(),
    };
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Grouping::upsert(&conn, &grouping).map_err(|e| format!("Failed to save grouping: {}", e))?;
    Ok(grouping)
}

pub fn list_groupings(db: &Database) -> Result<ListGroupingsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let groupings = Grouping::list(&conn).map_err(|e| format!("Failed to list groupings: {}", e))?;
    Ok(ListGroupingsResponse { groupings })
}

// --- Consumables ---

fn validate_consumable(cost_per_sample: Option<f64>, sample_size: Option<u32>) -> Result<(), String> {
    if let Some(cost) = cost_per_sample {
        if !cost.is_finite() || cost < 0.0 {
            return Err("cost_per_sample cannot be negative".to_string());
        }
    }
    if sample_size == Some(0) {
        return Err("sample_size must be at least 1".to_string());
    }
    Ok(())
}

pub fn add_consumable(db: &Database, data: ConsumableCreate) -> Result<ConsumableView, String> {
    if data.name.trim().is_empty() {
        return Err("Consumable name cannot be empty".to_string());
    }
    validate_consumable(Some(data.cost_per_sample), Some(data.sample_size))?;
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let consumable = Consumable::create(&conn, &data).map_err(|e| format!("Failed to create consumable: {}", e))?;
    Ok(ConsumableView::from(consumable))
}

pub fn list_consumables(db: &Database) -> Result<ListConsumablesResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let consumables = Consumable::list(&conn).map_err(|e| format!("Failed to list consumables: {}", e))?;
    let combined_unit_cost = consumables.iter().map(Consumable::unit_cost).sum();
    Ok(ListConsumablesResponse {
        consumables: consumables.into_iter().map(ConsumableView::from).collect(),
        combined_unit_cost,
    })
}

pub fn update_consumable(db: &Database, id: i64, data: ConsumableUpdate) -> Result<ConsumableView, String> {
    validate_consumable(data.cost_per_sample, data.sample_size)?;
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Consumable::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update consumable: {}", e))?
        .map(ConsumableView::from)
        .ok_or_else(|| format!("Consumable not found with id: {}", id))
}

pub fn delete_consumable(db: &Database, id: i64) -> Result<DeleteConsumableResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let deleted = Consumable::delete(&conn, id).map_err(|e| format!("Failed to delete consumable: {}", e))?;
    if !deleted {
        return Err(format!("Consumable not found with id: {}", id));
    }
    Ok(DeleteConsumableResponse {
        success: true,
        deleted_id: id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_db;

    #[test]
    fn test_label_set_lifecycle() {
        let db = test_db();
        assert!(save_label_set(&db, LabelSet::new("  ")).is_err());

        let mut set = LabelSet::new(" Jars ");
        set.days_to_expiry = 5;
        let saved = save_label_set(&db, set).unwrap();
        assert_eq!(saved.name, "Jars");
        assert_eq!(get_label_set(&db, "Jars").unwrap().unwrap().days_to_expiry, 5);
        assert_eq!(list_label_sets(&db).unwrap().total, 1);

        let deleted = delete_label_set(&db, "Jars").unwrap();
        assert_eq!(deleted.recipes_detached, 0);
        assert!(delete_label_set(&db, "Jars").is_err());
    }

    #[test]
    fn test_groupings() {
        let db = test_db();
        assert!(set_grouping(&db, 1, "Spices", " ").is_err());
        set_grouping(&db, 1, "Spices", "koření").unwrap();
        set_grouping(&db, 1, "Spices", "směs koření").unwrap();
        let groupings = list_groupings(&db).unwrap().groupings;
        assert_eq!(groupings.len(), 2);
        assert!(groupings[0].id.is_hidden());
        assert_eq!(groupings[1].display_text, "směs koření");
    }

    #[test]
    fn test_consumables() {
        let db = test_db();
        let bad = ConsumableCreate {
            name: "Lid".into(),
            description: String::new(),
            cost_per_sample: 10.0,
            sample_size: 0,
        };
        assert!(add_consumable(&db, bad).is_err());

        let cup = add_consumable(
            &db,
            ConsumableCreate {
                name: "Cup".into(),
                description: String::new(),
                cost_per_sample: 50.0,
                sample_size: 100,
            },
        )
        .unwrap();
        assert!((cup.unit_cost - 0.5).abs() < 1e-9);

        let updated = update_consumable(
            &db,
            cup.consumable.id,
            ConsumableUpdate {
                sample_size: Some(200),
                ..Default::default()
            },
        )
        .unwrap();
        assert!((updated.unit_cost - 0.25).abs() < 1e-9);
        assert!((list_consumables(&db).unwrap().combined_unit_cost - 0.25).abs() < 1e-9);

        delete_consumable(&db, cup.consumable.id).unwrap();
        assert!(delete_consumable(&db, cup.consumable.id).is_err());
    }
}
