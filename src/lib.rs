//! Larder Library
//!
//! Ingredient, recipe and packaging label management for small food producers.

pub mod build_info;
pub mod config;
pub mod db;
pub mod engine;
pub mod export;
pub mod mcp;
pub mod models;
pub mod reference;
pub mod tools;
