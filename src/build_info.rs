//! Build metadata and the startup banner

use serde::Serialize;

use crate::config::AppConfig;
use crate::export::FactsLanguage;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const RAW_BUILD_NUMBER: Option<&str> = option_env!("LARDER_BUILD_NUMBER");
const BUILD_PROFILE: Option<&str> = option_env!("LARDER_BUILD_PROFILE");
const BUILD_TIMESTAMP: Option<&str> = option_env!("LARDER_BUILD_TIMESTAMP");

/// What was built, and when
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    /// 0 when the build script did not stamp one
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub profile: &'static str,
}

fn parse_build_number(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: VERSION,
            build_number: parse_build_number(RAW_BUILD_NUMBER),
            build_timestamp: BUILD_TIMESTAMP.unwrap_or("unknown"),
            profile: BUILD_PROFILE.unwrap_or("unknown"),
        }
    }
}

fn language_name(language: FactsLanguage) -> &'static str {
    match language {
        FactsLanguage::Cs => "Czech",
        FactsLanguage::En => "English",
    }
}

/// Banner text: build stamp, then where data is read from and written to
pub fn banner_lines(info: &BuildInfo, config: &AppConfig) -> Vec<String> {
    let rule = "=".repeat(56);
    vec![
        rule.clone(),
        "  Larder - ingredients, recipes & packaging labels".to_string(),
        format!(
            "  v{} build {} ({}, {})",
            info.version, info.build_number, info.profile, info.build_timestamp
        ),
        rule.clone(),
        format!("  Database:    {}", config.database_path.display()),
        format!("  FDC tables:  {}", config.fdc_dir.display()),
        format!("  ICML export: {}", config.export_dir.display()),
        format!(
            "  Facts:       {}, decimal separator '{}'",
            language_name(config.facts_language),
            config.number_format.decimal_separator
        ),
        rule,
    ]
}

/// Print the banner to stderr; stdout carries the MCP transport
pub fn print_startup_banner(config: &AppConfig) {
    for line in banner_lines(&BuildInfo::current(), config) {
        eprintln!("{}", line);
    }
}
