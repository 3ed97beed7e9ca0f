//! Data models
//!
//! Rust structs representing database entities.

mod consumable;
mod grouping;
mod ingredient;
mod label_set;
mod nutrients;
mod recipe;
mod selection;

pub use consumable::{Consumable, ConsumableCreate, ConsumableUpdate};
pub use grouping::{Grouping, GroupingId, GroupingLabels};
pub use ingredient::{next_available_id, Ingredient, IngredientCreate, IngredientUpdate};
pub use label_set::LabelSet;
pub use nutrients::{Nutrient, NutrientProfile, MISSING};
pub use recipe::{Recipe, RecipeSummary};
pub use selection::{AbsoluteSelection, RatioSelection};
