//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("applied schema migration v1");
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- INGREDIENTS
        -- Nutrient values are per 100g; -1 marks a missing value
        -- ============================================
        CREATE TABLE ingredients (
            id TEXT PRIMARY KEY,                 -- 6-digit FDC code or generated 3-digit code
            name TEXT NOT NULL,
            label_text TEXT NOT NULL DEFAULT '', -- printed verbatim in contents lists
            info TEXT NOT NULL DEFAULT '',
            cost_per_kilo REAL NOT NULL DEFAULT 0,

            energy_kj REAL NOT NULL DEFAULT 0,
            energy_kcal REAL NOT NULL DEFAULT 0,
            fat REAL NOT NULL DEFAULT 0,
            saturates REAL NOT NULL DEFAULT 0,
            carbohydrates REAL NOT NULL DEFAULT 0,
            sugars REAL NOT NULL DEFAULT 0,
            protein REAL NOT NULL DEFAULT 0,
            salt REAL NOT NULL DEFAULT 0,        -- grams

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_ingredients_name ON ingredients(name);

        -- ============================================
        -- GROUPINGS
        -- Index 0 hides an ingredient from contents lists
        -- ============================================
        CREATE TABLE groupings (
            id INTEGER PRIMARY KEY,
            description TEXT NOT NULL DEFAULT '',
            display_text TEXT NOT NULL DEFAULT ''
        );

        INSERT INTO groupings (id, description, display_text)
        VALUES (0, 'Do not include in contents list', '');

        CREATE TABLE ingredient_groupings (
            ingredient_id TEXT NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
            grouping_id INTEGER NOT NULL REFERENCES groupings(id) ON DELETE CASCADE,
            PRIMARY KEY (ingredient_id, grouping_id)
        );

        -- ============================================
        -- LABEL SETS
        -- ============================================
        CREATE TABLE label_sets (
            name TEXT PRIMARY KEY,
            main_title TEXT NOT NULL DEFAULT '',
            sub_title TEXT NOT NULL DEFAULT '',
            contents_prefix TEXT NOT NULL DEFAULT '',
            nutrition_prefix TEXT NOT NULL DEFAULT '',
            additional_info TEXT NOT NULL DEFAULT '', -- may contain %WEIGHT%
            days_to_expiry INTEGER NOT NULL DEFAULT 1,
            unit_weight_override INTEGER,            -- null: use calculated weight
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- RECIPES
        -- keystone_grams is the weight in one unit; selection ratios
        -- are multiples of it
        -- ============================================
        CREATE TABLE recipes (
            title TEXT PRIMARY KEY,
            keystone_ingredient_id TEXT NOT NULL REFERENCES ingredients(id) ON DELETE RESTRICT,
            keystone_grams REAL NOT NULL CHECK (keystone_grams > 0),
            keystone_append_percent INTEGER NOT NULL DEFAULT 0,
            label_set TEXT REFERENCES label_sets(name) ON DELETE SET NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE recipe_selections (
            recipe_title TEXT NOT NULL REFERENCES recipes(title) ON DELETE CASCADE,
            ingredient_id TEXT NOT NULL REFERENCES ingredients(id) ON DELETE RESTRICT,
            ratio REAL NOT NULL,
            append_percent INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL,

            UNIQUE(recipe_title, ingredient_id)
        );

        CREATE INDEX idx_recipe_selections_recipe ON recipe_selections(recipe_title);
        CREATE INDEX idx_recipe_selections_ingredient ON recipe_selections(ingredient_id);

        -- ============================================
        -- CONSUMABLES
        -- Packaging items priced per sample
        -- ============================================
        CREATE TABLE consumables (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            cost_per_sample REAL NOT NULL DEFAULT 0,
            sample_size INTEGER NOT NULL DEFAULT 1 CHECK (sample_size > 0),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_migration(&conn).unwrap());
    }

    #[test]
    fn test_hidden_grouping_seeded() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let description: String = conn
            .query_row("SELECT description FROM groupings WHERE id = 0", [], |row| row.get(0))
            .unwrap();
        assert_eq!(description, "Do not include in contents list");
    }
}
