//! Runtime configuration
//!
//! Resolved once at startup from `LARDER_*` environment variables.

use std::path::PathBuf;

use crate::export::{FactsLanguage, NumberFormat};

pub const DATABASE_PATH_VAR: &str = "LARDER_DATABASE_PATH";
pub const FDC_DIR_VAR: &str = "LARDER_FDC_DIR";
pub const EXPORT_DIR_VAR: &str = "LARDER_EXPORT_DIR";
pub const DECIMAL_SEPARATOR_VAR: &str = "LARDER_DECIMAL_SEPARATOR";
pub const FACTS_LANGUAGE_VAR: &str = "LARDER_FACTS_LANGUAGE";

/// Application settings
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub fdc_dir: PathBuf,
    pub export_dir: PathBuf,
    pub number_format: NumberFormat,
    pub facts_language: FactsLanguage,
}

/// Project root: the executable's directory, or two levels up from
/// `target/{debug,release}`
pub fn project_root() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }
    path
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(project_root(), |key| std::env::var(key).ok())
    }

    /// Build from any variable source, defaulting paths under `root`
    pub fn from_lookup<F>(root: PathBuf, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path_or = |key: &str, default: PathBuf| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default)
        };

        let number_format = match lookup(DECIMAL_SEPARATOR_VAR).and_then(|v| v.trim().chars().next()) {
            Some(separator) => NumberFormat {
                decimal_separator: separator,
            },
            None => NumberFormat::default(),
        };

        let facts_language = match lookup(FACTS_LANGUAGE_VAR) {
            Some(value) => value.parse().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "falling back to Czech nutrition facts");
                FactsLanguage::default()
            }),
            None => FactsLanguage::default(),
        };

        Self {
            database_path: path_or(DATABASE_PATH_VAR, root.join("data").join("larder.db")),
            fdc_dir: path_or(FDC_DIR_VAR, root.join("fdc")),
            export_dir: path_or(EXPORT_DIR_VAR, root.join("export")),
            number_format,
            facts_language,
        }
    }
}
