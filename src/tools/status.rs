//! Larder Status Tool
//!
//! Provides runtime status information about the larder service.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::reference::ReferenceStatus;

/// Label workflow instructions for AI assistants
pub const LABEL_INSTRUCTIONS: &str = r#"
# Larder Label Instructions

This guide explains how to produce a food label with the larder tools.

## Overview

A label needs:
1. **Ingredients** - nutrient values per 100g, a contents-list text and a cost per kilo
2. **A recipe** (optional) - one keystone ingredient in grams plus ratios for the rest
3. **A label set** (optional) - heading, prefixes, footer and days to expiry

---

## Ingredients

- Nutrients are `energy_kj`, `energy_kcal`, `fat`, `saturates`, `carbohydrates`,
  `sugars`, `protein`, `salt` (grams, not sodium)
- Use `-1` for a value you do not know; the label shows `-` for it
- Omit `id` to get the next free 3-digit id, or import from FoodData Central
  with `import_reference_food` (the FDC code becomes the id)

### Contents text markup

| Marker | Meaning |
|--------|---------|
| `**text**` | bold |
| `__text__` | underlined |

Allergens are usually `__underlined__`. Plain-text output drops the markers.

### Groupings

Grouping 0 hides an ingredient from the contents list (water, processing aids).
Other groupings merge their ingredients under one display text, such as
`spices`. Configure them with `set_grouping`.

---

## Recipes

- The keystone is given in grams for one unit
- Every other selection is a ratio of the keystone (0.04 = 4% of the keystone weight)
- `batch` multiplies every weight

Use `create_recipe_from_selections` with absolute grams and a keystone id; ratios are derived.

---

## Labels

`calculate_label` takes either a `recipe` title or ad hoc `selections`.
Pass `units` to get unit weight and cost. The footer token `%WEIGHT%`
becomes the unit weight in grams.

`export_label_icml` writes an InDesign story file named after the label set.

---

## Notes

- Expiry dates use `dd-mm-yyyy`
- An ingredient used by a recipe cannot be deleted
- Deleting a label set detaches it from recipes
"#;

/// Runtime status of the larder service
#[derive(Debug, Clone, Serialize)]
pub struct LarderStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,

    /// Reference data
    pub reference: ReferenceStatus,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    /// Create a new status tracker
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Get the current status
    pub fn get_status(&self, reference: ReferenceStatus) -> LarderStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        LarderStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            reference,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
