//! Reference nutrient data
//!
//! Lookup and keyword search over a local FoodData Central export.

pub mod fdc;
pub mod search;

pub use fdc::{
    FdcReference, FdcTables, ReferenceError, ReferenceFood, ReferenceHit, ReferenceResult,
    ReferenceStatus,
};
pub use search::{matches_terms, search_terms};
