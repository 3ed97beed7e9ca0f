//! Larder MCP Server Implementation
//!
//! Implements the MCP server with all larder tools.

use std::collections::BTreeSet;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::db::Database;
use crate::models::{
    ConsumableCreate, ConsumableUpdate, GroupingId, IngredientCreate, IngredientUpdate, LabelSet,
    NutrientProfile, MISSING,
};
use crate::reference::FdcReference;
use crate::tools::ingredients;
use crate::tools::labels::{self, LabelRequest, LabelSource};
use crate::tools::recipes::{self, SelectionSpec};
use crate::tools::reference::{self, ReferenceImport};
use crate::tools::settings;
use crate::tools::status::StatusTracker;

/// Larder MCP Service
#[derive(Clone)]
pub struct LarderService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    config: Arc<AppConfig>,
    database: Database,
    reference: Arc<FdcReference>,
    tool_router: ToolRouter<LarderService>,
}

impl LarderService {
    pub fn new(config: AppConfig, database: Database, reference: Arc<FdcReference>) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(config.database_path.clone()))),
            config: Arc::new(config),
            database,
            reference,
            tool_router: Self::tool_router(),
        }
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn default_missing() -> f64 { MISSING }
fn default_search_limit() -> i64 { 20 }
fn default_list_limit() -> i64 { 50 }
fn default_batch() -> u32 { 1 }
fn default_days_to_expiry() -> u32 { 1 }

// ============================================================================
// Ingredient Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddIngredientParams {
    /// Numeric id; omit to use the next free 3-digit id
    pub id: Option<String>,
    pub name: String,
    /// Text printed in contents lists; supports **bold** and __underlined__
    #[serde(default)]
    pub label_text: String,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub cost_per_kilo: f64,
    /// Nutrient values per 100g; -1 when unknown
    #[serde(default = "default_missing")]
    pub energy_kj: f64,
    #[serde(default = "default_missing")]
    pub energy_kcal: f64,
    #[serde(default = "default_missing")]
    pub fat: f64,
    #[serde(default = "default_missing")]
    pub saturates: f64,
    #[serde(default = "default_missing")]
    pub carbohydrates: f64,
    #[serde(default = "default_missing")]
    pub sugars: f64,
    #[serde(default = "default_missing")]
    pub protein: f64,
    /// Salt in grams (not sodium)
    #[serde(default = "default_missing")]
    pub salt: f64,
    /// Grouping ids; 0 hides the ingredient from contents lists
    #[serde(default)]
    pub groupings: Vec<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IngredientIdParams {
    pub id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchIngredientsParams {
    /// Matches name, label text or id
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListIngredientsParams {
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateIngredientParams {
    pub id: String,
    pub name: Option<String>,
    pub label_text: Option<String>,
    pub info: Option<String>,
    pub cost_per_kilo: Option<f64>,
    /// Replaces all eight values at once, in the order
    /// energy_kj, energy_kcal, fat, saturates, carbohydrates, sugars, protein, salt
    pub nutrients: Option<[f64; 8]>,
    /// Replaces the grouping ids
    pub groupings: Option<Vec<u32>>,
}

// ============================================================================
// Recipe Parameter Structs
// ============================================================================

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct SelectionParams {
    pub ingredient_id: String,
    pub grams: f64,
    /// Print the weight percentage after this ingredient
    #[serde(default)]
    pub append_percent: bool,
}

impl From<SelectionParams> for SelectionSpec {
    fn from(p: SelectionParams) -> Self {
        Self {
            ingredient_id: p.ingredient_id,
            grams: p.grams,
            append_percent: p.append_percent,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateRecipeParams {
    pub title: String,
    /// Absolute grams for the whole batch
    pub selections: Vec<SelectionParams>,
    /// Keystone ingredient; defaults to the first selection with append_percent
    pub keystone_id: Option<String>,
    /// Number of units the selections make
    #[serde(default = "default_batch")]
    pub batch: u32,
    pub label_set: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RecipeTitleParams {
    pub title: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddRecipeSelectionParams {
    pub title: String,
    pub ingredient_id: String,
    /// Multiple of the keystone weight
    pub ratio: f64,
    #[serde(default)]
    pub append_percent: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateRecipeSelectionParams {
    pub title: String,
    pub ingredient_id: String,
    pub ratio: Option<f64>,
    pub append_percent: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateRecipeKeystoneParams {
    pub title: String,
    /// Keystone grams in one unit
    pub grams: Option<f64>,
    pub append_percent: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveRecipeSelectionParams {
    pub title: String,
    pub ingredient_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetRecipeLabelSetParams {
    pub title: String,
    /// Omit to detach the current label set
    pub label_set: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ResolveRecipeParams {
    pub title: String,
    #[serde(default = "default_batch")]
    pub batch: u32,
}

// ============================================================================
// Label Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LabelParams {
    /// Recipe title; give this or selections
    pub recipe: Option<String>,
    /// Units the recipe is scaled to
    #[serde(default = "default_batch")]
    pub batch: u32,
    /// Ad hoc absolute selections; give this or recipe
    pub selections: Option<Vec<SelectionParams>>,
    /// Units the selections are split into; defaults to batch for recipes
    pub units: Option<u32>,
    /// Overrides the recipe's label set
    pub label_set: Option<String>,
    /// Overrides the label set's days to expiry
    pub expiry_days: Option<u32>,
}

impl LabelParams {
    fn into_request(self) -> Result<LabelRequest, McpError> {
        let source = match (self.recipe, self.selections) {
            (Some(title), None) => LabelSource::Recipe {
                title,
                batch: self.batch,
            },
            (None, Some(selections)) => {
                LabelSource::Selections(selections.into_iter().map(SelectionSpec::from).collect())
            }
            _ => {
                return Err(McpError::invalid_params(
                    "Give either recipe or selections",
                    None,
                ))
            }
        };
        Ok(LabelRequest {
            source,
            units: self.units,
            label_set: self.label_set,
            expiry_days: self.expiry_days,
        })
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveLabelSetParams {
    pub name: String,
    #[serde(default)]
    pub main_title: String,
    #[serde(default)]
    pub sub_title: String,
    /// Printed before the contents list, e.g. "**Složení:** "
    #[serde(default)]
    pub contents_prefix: String,
    #[serde(default)]
    pub nutrition_prefix: String,
    /// Footer text; %WEIGHT% becomes the unit weight
    #[serde(default)]
    pub additional_info: String,
    #[serde(default = "default_days_to_expiry")]
    pub days_to_expiry: u32,
    /// Printed instead of the calculated unit weight
    pub unit_weight_override: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LabelSetNameParams {
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetGroupingParams {
    /// Grouping id; 0 is the hidden grouping
    pub id: u32,
    #[serde(default)]
    pub description: String,
    /// Printed in contents lists in place of the member ingredients
    #[serde(default)]
    pub display_text: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddConsumableParams {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Price of one purchased sample
    pub cost_per_sample: f64,
    /// Items in one sample
    pub sample_size: u32,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateConsumableParams {
    pub id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub cost_per_sample: Option<f64>,
    pub sample_size: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConsumableIdParams {
    pub id: i64,
}

// ============================================================================
// Reference Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchReferenceParams {
    /// Keywords separated by spaces, commas or periods, or an FDC id
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ReferenceFoodParams {
    pub fdc_id: u32,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImportReferenceFoodParams {
    pub fdc_id: u32,
    /// Defaults to the FDC description
    pub name: Option<String>,
    #[serde(default)]
    pub label_text: String,
    #[serde(default)]
    pub cost_per_kilo: f64,
    #[serde(default)]
    pub groupings: Vec<u32>,
}

fn grouping_set(ids: Vec<u32>) -> BTreeSet<GroupingId> {
    ids.into_iter().map(GroupingId).collect()
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl LarderService {
    // --- Status ---

    #[tool(description = "Get the current status of the larder service including build info, database status, reference data loading and process information")]
    async fn larder_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(self.reference.status());
        json_result(&status)
    }

    #[tool(description = "Get step-by-step instructions for producing food labels. Call this when starting a session or when unsure how the ingredient, recipe and label tools fit together.")]
    fn label_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::LABEL_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(LABEL_INSTRUCTIONS)]))
    }

    // --- Ingredients ---

    #[tool(description = "Create an ingredient with nutrient values per 100g, label text, cost per kilo and groupings. Unknown nutrient values are -1.")]
    fn add_ingredient(&self, Parameters(p): Parameters<AddIngredientParams>) -> Result<CallToolResult, McpError> {
        let data = IngredientCreate {
            id: p.id,
            name: p.name,
            label_text: p.label_text,
            info: p.info,
            cost_per_kilo: p.cost_per_kilo,
            nutrients: NutrientProfile::from_values([
                p.energy_kj, p.energy_kcal, p.fat, p.saturates,
                p.carbohydrates, p.sugars, p.protein, p.salt,
            ]),
            groupings: grouping_set(p.groupings),
        };
        let result = ingredients::add_ingredient(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get full details for an ingredient including missing nutrient values and recipe usage")]
    fn get_ingredient(&self, Parameters(p): Parameters<IngredientIdParams>) -> Result<CallToolResult, McpError> {
        let result = ingredients::get_ingredient(&self.database, &p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(item) => json_result(&item),
            None => json_result(&serde_json::json!({"error": "Ingredient not found", "id": p.id})),
        }
    }

    #[tool(description = "Search ingredients by name, label text or id")]
    fn search_ingredients(&self, Parameters(p): Parameters<SearchIngredientsParams>) -> Result<CallToolResult, McpError> {
        let result = ingredients::search_ingredients(&self.database, &p.query, p.limit).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "List ingredients alphabetically with pagination")]
    fn list_ingredients(&self, Parameters(p): Parameters<ListIngredientsParams>) -> Result<CallToolResult, McpError> {
        let result = ingredients::list_ingredients(&self.database, p.limit, p.offset).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Update an ingredient. The id cannot change. Recipes pick up the new values the next time they are calculated.")]
    fn update_ingredient(&self, Parameters(p): Parameters<UpdateIngredientParams>) -> Result<CallToolResult, McpError> {
        let data = IngredientUpdate {
            name: p.name,
            label_text: p.label_text,
            info: p.info,
            cost_per_kilo: p.cost_per_kilo,
            nutrients: p.nutrients.map(NutrientProfile::from_values),
            groupings: p.groupings.map(grouping_set),
        };
        let result = ingredients::update_ingredient(&self.database, &p.id, data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Delete an ingredient (only allowed if no recipe uses it)")]
    fn delete_ingredient(&self, Parameters(p): Parameters<IngredientIdParams>) -> Result<CallToolResult, McpError> {
        let result = ingredients::delete_ingredient(&self.database, &p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Ok(success) => json_result(&success),
            Err(blocked) => json_result(&blocked),
        }
    }

    #[tool(description = "Get the lowest unused generated ingredient id (001-999)")]
    fn next_ingredient_id(&self) -> Result<CallToolResult, McpError> {
        let result = ingredients::next_ingredient_id(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Recipes ---

    #[tool(description = "Create a recipe from absolute grams for a batch. The keystone's weight per unit anchors the recipe and every other selection is stored as a ratio of it.")]
    fn create_recipe_from_selections(&self, Parameters(p): Parameters<CreateRecipeParams>) -> Result<CallToolResult, McpError> {
        let specs: Vec<SelectionSpec> = p.selections.into_iter().map(SelectionSpec::from).collect();
        let result = recipes::create_recipe_from_selections(
            &self.database, &p.title, &specs, p.keystone_id.as_deref(), p.batch, p.label_set.as_deref(),
        ).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get a recipe with its keystone, ratios and grams per unit")]
    fn get_recipe(&self, Parameters(p): Parameters<RecipeTitleParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::get_recipe(&self.database, &p.title).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(recipe) => json_result(&recipe),
            None => json_result(&serde_json::json!({"error": "Recipe not found", "title": p.title})),
        }
    }

    #[tool(description = "List all recipes")]
    fn list_recipes(&self) -> Result<CallToolResult, McpError> {
        let result = recipes::list_recipes(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Add an ingredient to a recipe as a multiple of the keystone weight")]
    fn add_recipe_selection(&self, Parameters(p): Parameters<AddRecipeSelectionParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::add_recipe_selection(&self.database, &p.title, &p.ingredient_id, p.ratio, p.append_percent)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Change the ratio or percent flag of a recipe selection")]
    fn update_recipe_selection(&self, Parameters(p): Parameters<UpdateRecipeSelectionParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::update_recipe_selection(&self.database, &p.title, &p.ingredient_id, p.ratio, p.append_percent)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Change the keystone's grams per unit or percent flag; ratios are kept, so every other weight scales with it")]
    fn update_recipe_keystone(&self, Parameters(p): Parameters<UpdateRecipeKeystoneParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::update_recipe_keystone(&self.database, &p.title, p.grams, p.append_percent)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Remove a ratio selection from a recipe (the keystone cannot be removed)")]
    fn remove_recipe_selection(&self, Parameters(p): Parameters<RemoveRecipeSelectionParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::remove_recipe_selection(&self.database, &p.title, &p.ingredient_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Attach a label set to a recipe, or detach it by omitting label_set")]
    fn set_recipe_label_set(&self, Parameters(p): Parameters<SetRecipeLabelSetParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::set_recipe_label_set(&self.database, &p.title, p.label_set.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Delete a recipe")]
    fn delete_recipe(&self, Parameters(p): Parameters<RecipeTitleParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::delete_recipe(&self.database, &p.title).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get absolute grams of every recipe ingredient for a batch of units")]
    fn resolve_recipe(&self, Parameters(p): Parameters<ResolveRecipeParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::resolve_recipe(&self.database, &p.title, p.batch).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Labels ---

    #[tool(description = "Calculate a label from a recipe or ad hoc selections: nutrients per 100g, contents list, unit weight and cost, and the label text blocks with and without markup")]
    fn calculate_label(&self, Parameters(p): Parameters<LabelParams>) -> Result<CallToolResult, McpError> {
        let request = p.into_request()?;
        let result = labels::calculate_label(&self.database, &self.config, &request, today())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Export a label as an InDesign ICML story named after its label set into the export directory")]
    fn export_label_icml(&self, Parameters(p): Parameters<LabelParams>) -> Result<CallToolResult, McpError> {
        let request = p.into_request()?;
        let result = labels::export_label_icml(&self.database, &self.config, &request, today())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Label Sets ---

    #[tool(description = "Create or replace a label set: heading, subheading, contents and nutrition prefixes, footer with %WEIGHT%, days to expiry")]
    fn save_label_set(&self, Parameters(p): Parameters<SaveLabelSetParams>) -> Result<CallToolResult, McpError> {
        let set = LabelSet {
            name: p.name,
            main_title: p.main_title,
            sub_title: p.sub_title,
            contents_prefix: p.contents_prefix,
            nutrition_prefix: p.nutrition_prefix,
            additional_info: p.additional_info,
            days_to_expiry: p.days_to_expiry,
            unit_weight_override: p.unit_weight_override,
        };
        let result = settings::save_label_set(&self.database, set).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get a label set by name")]
    fn get_label_set(&self, Parameters(p): Parameters<LabelSetNameParams>) -> Result<CallToolResult, McpError> {
        let result = settings::get_label_set(&self.database, &p.name).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(set) => json_result(&set),
            None => json_result(&serde_json::json!({"error": "Label set not found", "name": p.name})),
        }
    }

    #[tool(description = "List all label sets")]
    fn list_label_sets(&self) -> Result<CallToolResult, McpError> {
        let result = settings::list_label_sets(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Delete a label set; recipes using it are detached")]
    fn delete_label_set(&self, Parameters(p): Parameters<LabelSetNameParams>) -> Result<CallToolResult, McpError> {
        let result = settings::delete_label_set(&self.database, &p.name).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Groupings ---

    #[tool(description = "Create or update a grouping. Ingredients in a grouping are printed as one contents entry with its display text.")]
    fn set_grouping(&self, Parameters(p): Parameters<SetGroupingParams>) -> Result<CallToolResult, McpError> {
        let result = settings::set_grouping(&self.database, p.id, &p.description, &p.display_text)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "List all groupings")]
    fn list_groupings(&self) -> Result<CallToolResult, McpError> {
        let result = settings::list_groupings(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Consumables ---

    #[tool(description = "Add a packaging consumable priced per sample")]
    fn add_consumable(&self, Parameters(p): Parameters<AddConsumableParams>) -> Result<CallToolResult, McpError> {
        let data = ConsumableCreate {
            name: p.name,
            description: p.description,
            cost_per_sample: p.cost_per_sample,
            sample_size: p.sample_size,
        };
        let result = settings::add_consumable(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "List consumables with the combined packaging cost of one unit")]
    fn list_consumables(&self) -> Result<CallToolResult, McpError> {
        let result = settings::list_consumables(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Update a consumable")]
    fn update_consumable(&self, Parameters(p): Parameters<UpdateConsumableParams>) -> Result<CallToolResult, McpError> {
        let data = ConsumableUpdate {
            name: p.name,
            description: p.description,
            cost_per_sample: p.cost_per_sample,
            sample_size: p.sample_size,
        };
        let result = settings::update_consumable(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Delete a consumable")]
    fn delete_consumable(&self, Parameters(p): Parameters<ConsumableIdParams>) -> Result<CallToolResult, McpError> {
        let result = settings::delete_consumable(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Reference Data ---

    #[tool(description = "Get the loading state of the FoodData Central reference tables")]
    fn reference_status(&self) -> Result<CallToolResult, McpError> {
        json_result(&reference::reference_status(&self.reference))
    }

    #[tool(description = "Search FoodData Central foods; every keyword must appear in the description")]
    fn search_reference_foods(&self, Parameters(p): Parameters<SearchReferenceParams>) -> Result<CallToolResult, McpError> {
        let limit = usize::try_from(p.limit).unwrap_or(1);
        let result = reference::search_reference_foods(&self.reference, &p.query, limit)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get a FoodData Central food with its nutrient values per 100g (salt derived from sodium)")]
    fn get_reference_food(&self, Parameters(p): Parameters<ReferenceFoodParams>) -> Result<CallToolResult, McpError> {
        let result = reference::get_reference_food(&self.reference, p.fdc_id).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Create an ingredient from a FoodData Central food; the FDC id becomes the ingredient id")]
    fn import_reference_food(&self, Parameters(p): Parameters<ImportReferenceFoodParams>) -> Result<CallToolResult, McpError> {
        let options = ReferenceImport {
            name: p.name,
            label_text: p.label_text,
            cost_per_kilo: p.cost_per_kilo,
            groupings: grouping_set(p.groupings),
        };
        let result = reference::import_reference_food(&self.database, &self.reference, p.fdc_id, options)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for LarderService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "larder".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Larder".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Larder - ingredients, recipes and nutrition labels for small food producers. \
                 IMPORTANT: Call label_instructions before producing a first label. \
                 Ingredients: add/get/search/list/update/delete_ingredient, next_ingredient_id. \
                 Recipes: create_recipe_from_selections, get/list/delete_recipe, \
                 add/update/remove_recipe_selection, update_recipe_keystone, set_recipe_label_set, resolve_recipe. \
                 Labels: calculate_label, export_label_icml. \
                 Label sets: save/get/list/delete_label_set. Groupings: set_grouping, list_groupings. \
                 Consumables: add/list/update/delete_consumable. \
                 Reference: reference_status, search_reference_foods, get_reference_food, import_reference_food."
                    .into(),
            ),
        }
    }
}
