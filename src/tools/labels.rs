//! Label MCP Tools
//!
//! Turns a recipe or ad hoc selections into label figures and text.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use crate::config::AppConfig;
use crate::db::Database;
use crate::engine::{self, ContentsList, UnitCost};
use crate::export::{self, ComposeOptions, LabelText};
use crate::models::{AbsoluteSelection, Consumable, Grouping, LabelSet, NutrientProfile, Recipe};
use super::recipes::{load_selections, SelectionSpec};

/// What a label is calculated from
#[derive(Debug, Clone)]
pub enum LabelSource {
    /// A stored recipe scaled to `batch` units
    Recipe { title: String, batch: u32 },
    /// Absolute grams
    Selections(Vec<SelectionSpec>),
}

/// Input for calculate_label and export_label_icml
#[derive(Debug, Clone)]
pub struct LabelRequest {
    pub source: LabelSource,
    /// Units the selections are split into; defaults to the batch for recipes
    pub units: Option<u32>,
    /// Overrides the recipe's label set
    pub label_set: Option<String>,
    /// Overrides the label set's days to expiry
    pub expiry_days: Option<u32>,
}

/// Per-unit figures with packaging included
#[derive(Debug, Serialize)]
pub struct UnitView {
    pub units: u32,
    pub weight_grams: u32,
    /// Weight printed on the label after any override
    pub printed_weight_grams: u32,
    pub ingredient_cost: UnitCost,
    pub consumables_cost: f64,
    /// Ingredient plus packaging cost; unresolved when any ingredient cost is
    pub total_cost: UnitCost,
}

/// Response for calculate_label
#[derive(Debug, Serialize)]
pub struct LabelResponse {
    pub recipe: Option<String>,
    pub label_set: Option<String>,
    pub total_grams: f64,
    pub nutrients_per_100g: NutrientProfile,
    pub contents: ContentsList,
    pub unit: Option<UnitView>,
    /// Label blocks with inline markup
    pub text: LabelText,
    /// Label blocks without markup
    pub plain_text: LabelText,
    /// Nutrition facts followed by the unit weight, for on-screen preview
    pub nutrition_preview: String,
    pub missing_nutrients: Vec<String>,
    pub warnings: Vec<String>,
}

/// Response for export_label_icml
#[derive(Debug, Serialize)]
pub struct ExportLabelResponse {
    pub success: bool,
    pub path: String,
    pub label_set: String,
    pub warnings: Vec<String>,
}

struct ResolvedSource {
    recipe: Option<String>,
    label_set: Option<String>,
    selections: Vec<AbsoluteSelection>,
    units: Option<u32>,
}

fn resolve_source(conn: &Connection, request: &LabelRequest) -> Result<ResolvedSource, String> {
    match &request.source {
        LabelSource::Recipe { title, batch } => {
            let recipe = Recipe::get_by_title(conn, title)
                .map_err(|e| format!("Failed to get recipe: {}", e))?
                .ok_or_else(|| format!("Recipe not found: {}", title))?;
            let selections = recipe.resolve(*batch).map_err(|e| e.to_string())?;
            Ok(ResolvedSource {
                label_set: request.label_set.clone().or(recipe.label_set),
                recipe: Some(recipe.title),
                selections,
                units: Some(request.units.unwrap_or(*batch)),
            })
        }
        LabelSource::Selections(specs) => {
            if specs.is_empty() {
                return Err("At least one selection is required".to_string());
            }
            Ok(ResolvedSource {
                recipe: None,
                label_set: request.label_set.clone(),
                selections: load_selections(conn, specs)?,
                units: request.units,
            })
        }
    }
}

fn load_label_set(conn: &Connection, name: Option<&str>) -> Result<Option<LabelSet>, String> {
    let Some(name) = name else {
        return Ok(None);
    };
    LabelSet::get(conn, name)
        .map_err(|e| format!("Failed to get label set: {}", e))?
        .ok_or_else(|| format!("Label set not found: {}", name))
        .map(Some)
}

/// Calculate nutrients, contents, unit figures and label text
pub fn calculate_label(
    db: &Database,
    config: &AppConfig,
    request: &LabelRequest,
    today: NaiveDate,
) -> Result<LabelResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let source = resolve_source(&conn, request)?;
    let label_set = load_label_set(&conn, source.label_set.as_deref())?;
    let groupings = Grouping::labels(&conn).map_err(|e| format!("Failed to load groupings: {}", e))?;

    let figures = engine::compute_label(&source.selections, &groupings, source.units)
        .map_err(|e| e.to_string())?;

    let options = ComposeOptions {
        format: config.number_format,
        language: config.facts_language,
        today,
        expiry_days: request.expiry_days,
    };
    let text = export::compose(&figures, label_set.as_ref(), &options);
    let nutrition_preview = export::nutrition_facts(
        &figures.nutrients,
        &config.number_format,
        config.facts_language,
        figures.unit.as_ref().map(|u| u.weight),
    );

    let unit = match &figures.unit {
        Some(unit) => {
            let consumables_cost = Consumable::combined_unit_cost(&conn)
                .map_err(|e| format!("Failed to load consumables: {}", e))?;
            Some(UnitView {
                units: unit.units,
                weight_grams: unit.weight,
                printed_weight_grams: label_set
                    .as_ref()
                    .and_then(|s| s.unit_weight_override)
                    .unwrap_or(unit.weight),
                total_cost: unit.cost.plus(consumables_cost),
                ingredient_cost: unit.cost.clone(),
                consumables_cost,
            })
        }
        None => None,
    };

    Ok(LabelResponse {
        recipe: source.recipe,
        label_set: label_set.map(|s| s.name),
        total_grams: figures.total_grams,
        nutrients_per_100g: figures.nutrients,
        missing_nutrients: figures.missing.iter().map(ToString::to_string).collect(),
        warnings: export::label_warnings(&source.selections),
        contents: figures.contents,
        unit,
        plain_text: text.plain(),
        text,
        nutrition_preview,
    })
}

/// Write the label as `<label set>.icml` into the export directory
pub fn export_label_icml(
    db: &Database,
    config: &AppConfig,
    request: &LabelRequest,
    today: NaiveDate,
) -> Result<ExportLabelResponse, String> {
    let label = calculate_label(db, config, request, today)?;
    let Some(name) = label.label_set.clone() else {
        return Err("A label set is required to export a label".to_string());
    };

    let path = export::write_icml(&config.export_dir, &name, &label.text)
        .map_err(|e| format!("Failed to export label: {}", e))?;

    Ok(ExportLabelResponse {
        success: true,
        path: path.display().to_string(),
        label_set: name,
        warnings: label.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use crate::export::{FactsLanguage, NumberFormat};
    use crate::models::{ConsumableCreate, GroupingId, Ingredient, IngredientCreate};
    use crate::tools::recipes::create_recipe_from_selections;
    use crate::tools::test_db;

    fn config(export_dir: PathBuf) -> AppConfig {
        AppConfig {
            database_path: PathBuf::from(":memory:"),
            fdc_dir: PathBuf::from("fdc"),
            export_dir,
            number_format: NumberFormat::comma(),
            facts_language: FactsLanguage::Cs,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 28).unwrap()
    }

    fn seed(db: &Database) {
        let conn = db.get_conn().unwrap();
        let ingredients = [
            ("001", "Oats", "oves", 2.0, [1500.0, 358.0, 7.0, 1.2, 60.0, 1.0, 13.0, 0.0], None),
            ("002", "Salt", "sůl", 1.0, [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 100.0], None),
            ("003", "Water", "", 0.0, [0.0; 8], Some(GroupingId::HIDDEN)),
        ];
        for (id, name, label, cost, values, grouping) in ingredients {
            Ingredient::create(
                &conn,
                &IngredientCreate {
                    id: Some(id.into()),
                    name: name.into(),
                    label_text: label.into(),
                    info: String::new(),
                    cost_per_kilo: cost,
                    nutrients: NutrientProfile::from_values(values),
                    groupings: grouping.into_iter().collect::<BTreeSet<_>>(),
                },
            )
            .unwrap();
        }
        let mut set = LabelSet::new("Oats");
        set.main_title = "**OVES**".into();
        set.contents_prefix = "Složení: ".into();
        set.additional_info = "Hmotnost: %WEIGHT% g".into();
        set.days_to_expiry = 2;
        LabelSet::save(&conn, &set).unwrap();
    }

    fn selections() -> LabelSource {
        LabelSource::Selections(vec![
            SelectionSpec { ingredient_id: "001".into(), grams: 600.0, append_percent: true },
            SelectionSpec { ingredient_id: "002".into(), grams: 10.0, append_percent: false },
        ])
    }

    #[test]
    fn test_calculate_from_selections() {
        let db = test_db();
        seed(&db);
        let request = LabelRequest {
            source: selections(),
            units: Some(2),
            label_set: Some("Oats".into()),
            expiry_days: None,
        };
        let label = calculate_label(&db, &config(PathBuf::from("export")), &request, today()).unwrap();

        assert_eq!(label.contents.render(), "oves 98%, sůl.");
        assert_eq!(label.text.contents, "Složení: oves 98%, sůl.");
        assert_eq!(label.text.footer, "Hmotnost: 305 g");
        assert_eq!(label.text.expiry, "01-03-2024");
        assert_eq!(label.plain_text.heading, "OVES");

        let unit = label.unit.unwrap();
        assert_eq!(unit.weight_grams, 305);
        assert!((unit.ingredient_cost.value() - 0.605).abs() < 1e-9);
        assert!((unit.total_cost.value() - 0.605).abs() < 1e-9);
        assert!(label.warnings.is_empty());
    }

    #[test]
    fn test_consumables_added_to_unit_cost() {
        let db = test_db();
        seed(&db);
        {
            let conn = db.get_conn().unwrap();
            Consumable::create(
                &conn,
                &ConsumableCreate {
                    name: "Cup".into(),
                    description: String::new(),
                    cost_per_sample: 50.0,
                    sample_size: 100,
                },
            )
            .unwrap();
        }
        let request = LabelRequest {
            source: selections(),
            units: Some(1),
            label_set: None,
            expiry_days: Some(3),
        };
        let label = calculate_label(&db, &config(PathBuf::from("export")), &request, today()).unwrap();
        let unit = label.unit.unwrap();
        assert!((unit.consumables_cost - 0.5).abs() < 1e-9);
        assert!((unit.total_cost.value() - 1.71).abs() < 1e-9);
        assert_eq!(label.text.expiry, "02-03-2024");
        assert_eq!(label.text.footer, "");
    }

    #[test]
    fn test_recipe_label_and_export() {
        let db = test_db();
        seed(&db);
        let specs = [
            SelectionSpec { ingredient_id: "001".into(), grams: 600.0, append_percent: true },
            SelectionSpec { ingredient_id: "002".into(), grams: 10.0, append_percent: false },
            SelectionSpec { ingredient_id: "003".into(), grams: 1000.0, append_percent: false },
        ];
        create_recipe_from_selections(&db, "Salted oats", &specs, Some("001"), 2, Some("Oats")).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let request = LabelRequest {
            source: LabelSource::Recipe { title: "Salted oats".into(), batch: 2 },
            units: None,
            label_set: None,
            expiry_days: None,
        };
        let label = calculate_label(&db, &config(dir.path().to_path_buf()), &request, today()).unwrap();
        assert_eq!(label.recipe.as_deref(), Some("Salted oats"));
        assert_eq!(label.label_set.as_deref(), Some("Oats"));
        assert_eq!(label.contents.render(), "oves 37%, sůl.");
        assert_eq!(label.unit.as_ref().unwrap().weight_grams, 805);
        assert!(label.nutrition_preview.ends_with("\nUnit weight: 805g"));
        assert!(!label.text.nutrition.contains("Unit weight"));

        let exported = export_label_icml(&db, &config(dir.path().to_path_buf()), &request, today()).unwrap();
        assert!(exported.path.ends_with("Oats.icml"));
        let written = std::fs::read_to_string(dir.path().join("Oats.icml")).unwrap();
        assert!(written.contains("Hmotnost: 805 g"));
        assert!(!written.contains("Unit weight"));
    }

    #[test]
    fn test_export_requires_label_set() {
        let db = test_db();
        seed(&db);
        let request = LabelRequest {
            source: selections(),
            units: None,
            label_set: None,
            expiry_days: None,
        };
        let dir = tempfile::tempdir().unwrap();
        assert!(export_label_icml(&db, &config(dir.path().to_path_buf()), &request, today()).is_err());

        let unknown = LabelRequest {
            label_set: Some("Jars".into()),
            ..request
        };
        assert!(calculate_label(&db, &config(dir.path().to_path_buf()), &unknown, today()).is_err());
    }
}
