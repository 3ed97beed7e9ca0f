//! Larder Tools module
//!
//! MCP tool implementations for ingredients, recipes and labels.

pub mod ingredients;
pub mod labels;
pub mod recipes;
pub mod reference;
pub mod settings;
pub mod status;

#[cfg(test)]
pub(crate) fn test_db() -> crate::db::Database {
    let db = crate::db::Database::in_memory().unwrap();
    crate::db::migrations::run_migrations(&db.get_conn().unwrap()).unwrap();
    db
}
