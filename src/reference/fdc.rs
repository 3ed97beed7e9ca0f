//! FoodData Central reference tables
//!
//! Reads the `food.csv` and `food_nutrient.csv` exports of the USDA FoodData
//! Central database. The nutrient table is large, so it is loaded on a
//! blocking worker while the server keeps answering requests.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use thiserror::Error;

use crate::models::{Nutrient, NutrientProfile};
use super::search::{matches_terms, search_terms};

pub const FOOD_FILE: &str = "food.csv";
pub const FOOD_NUTRIENT_FILE: &str = "food_nutrient.csv";

/// FDC nutrient ids of the declared nutrients
const NUTRIENT_IDS: [(u32, Nutrient); 7] = [
    (1062, Nutrient::EnergyKj),
    (1008, Nutrient::EnergyKcal),
    (1004, Nutrient::Fat),
    (1258, Nutrient::Saturates),
    (1005, Nutrient::Carbohydrates),
    (2000, Nutrient::Sugars),
    (1003, Nutrient::Protein),
];

/// Sodium in mg, declared as salt in g
const SODIUM_ID: u32 = 1093;

/// Grams of salt per milligram of sodium
const SALT_PER_SODIUM_MG: f64 = 2.5 / 1000.0;

/// Reference data error types
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Reference data is still loading")]
    NotReady,

    #[error("Reference data failed to load: {0}")]
    LoadFailed(String),
}

pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// Split one CSV line, honouring quoted fields and doubled quotes
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Map of FDC id to food description
///
/// Rows that do not parse (the header among them) are skipped.
pub fn parse_foods<R: BufRead>(reader: R) -> std::io::Result<BTreeMap<u32, String>> {
    let mut foods = BTreeMap::new();
    for line in reader.lines() {
        let line = line?;
        let fields = split_csv_line(&line);
        if fields.len() < 3 {
            continue;
        }
        if let Ok(id) = fields[0].trim().parse::<u32>() {
            foods.insert(id, fields[2].clone());
        }
    }
    Ok(foods)
}

/// Map of FDC id to declared nutrient values
///
/// Nutrients a food has no row for stay at the missing sentinel.
pub fn parse_food_nutrients<R: BufRead>(reader: R) -> std::io::Result<HashMap<u32, NutrientProfile>> {
    let mut profiles: HashMap<u32, NutrientProfile> = HashMap::new();
    let mut skipped = 0usize;

    for line in reader.lines() {
        let line = line?;
        let fields = split_csv_line(&line);
        if fields.len() < 4 {
            skipped += 1;
            continue;
        }
        let parsed = (
            fields[1].trim().parse::<u32>(),
            fields[2].trim().parse::<u32>(),
            fields[3].trim().parse::<f64>(),
        );
        let (Ok(fdc_id), Ok(nutrient_id), Ok(amount)) = parsed else {
            skipped += 1;
            continue;
        };

        let target = if nutrient_id == SODIUM_ID {
            Some((Nutrient::Salt, amount * SALT_PER_SODIUM_MG))
        } else {
            NUTRIENT_IDS
                .iter()
                .find(|(id, _)| *id == nutrient_id)
                .map(|(_, nutrient)| (*nutrient, amount))
        };

        if let Some((nutrient, value)) = target {
            profiles
                .entry(fdc_id)
                .or_insert_with(NutrientProfile::missing)
                .set(nutrient, value);
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, "skipped unparseable food_nutrient rows");
    }
    Ok(profiles)
}

fn open(path: &Path) -> ReferenceResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ReferenceError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Loaded reference tables
#[derive(Debug, Default)]
pub struct FdcTables {
    pub foods: BTreeMap<u32, String>,
    pub nutrients: HashMap<u32, NutrientProfile>,
}

impl FdcTables {
    pub fn load(dir: &Path) -> ReferenceResult<Self> {
        let food_path = dir.join(FOOD_FILE);
        let foods = parse_foods(open(&food_path)?).map_err(|source| ReferenceError::Io {
            path: food_path.clone(),
            source,
        })?;

        let nutrient_path = dir.join(FOOD_NUTRIENT_FILE);
        let nutrients =
            parse_food_nutrients(open(&nutrient_path)?).map_err(|source| ReferenceError::Io {
                path: nutrient_path.clone(),
                source,
            })?;

        Ok(Self { foods, nutrients })
    }
}

/// A reference food with its nutrient values
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceFood {
    pub fdc_id: u32,
    pub description: String,
    pub nutrients: NutrientProfile,
}

/// A search match
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceHit {
    pub fdc_id: u32,
    pub description: String,
}

/// Loader state reported to clients
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceStatus {
    pub ready: bool,
    pub directory: String,
    pub food_count: usize,
    pub nutrient_profile_count: usize,
    pub error: Option<String>,
}

/// Shared handle to the reference tables
#[derive(Debug)]
pub struct FdcReference {
    dir: PathBuf,
    ready: AtomicBool,
    tables: RwLock<FdcTables>,
    error: RwLock<Option<String>>,
}

impl FdcReference {
    pub fn new(dir: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            dir: dir.into(),
            ready: AtomicBool::new(false),
            tables: RwLock::new(FdcTables::default()),
            error: RwLock::new(None),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Read both tables on the calling thread
    pub fn load_blocking(&self) -> ReferenceResult<()> {
        let started = std::time::Instant::now();
        match FdcTables::load(&self.dir) {
            Ok(tables) => {
                tracing::info!(
                    foods = tables.foods.len(),
                    profiles = tables.nutrients.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "loaded FDC reference data"
                );
                *self.tables.write().unwrap_or_else(PoisonError::into_inner) = tables;
                *self.error.write().unwrap_or_else(PoisonError::into_inner) = None;
                self.ready.store(true, Ordering::Release);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "FDC reference data unavailable");
                *self.error.write().unwrap_or_else(PoisonError::into_inner) = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Load the tables on a blocking worker
    pub fn spawn_load(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let reference = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let _ = reference.load_blocking();
        })
    }

    fn check_ready(&self) -> ReferenceResult<()> {
        if self.is_ready() {
            return Ok(());
        }
        match self.error.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            Some(message) => Err(ReferenceError::LoadFailed(message.clone())),
            None => Err(ReferenceError::NotReady),
        }
    }

    pub fn status(&self) -> ReferenceStatus {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        ReferenceStatus {
            ready: self.is_ready(),
            directory: self.dir.display().to_string(),
            food_count: tables.foods.len(),
            nutrient_profile_count: tables.nutrients.len(),
            error: self.error.read().unwrap_or_else(PoisonError::into_inner).clone(),
        }
    }

    /// A food and its nutrients; None until loaded or for unknown ids
    pub fn food(&self, fdc_id: u32) -> Option<ReferenceFood> {
        if !self.is_ready() {
            return None;
        }
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let description = tables.foods.get(&fdc_id)?.clone();
        let nutrients = tables
            .nutrients
            .get(&fdc_id)
            .copied()
            .unwrap_or_else(NutrientProfile::missing);
        Some(ReferenceFood {
            fdc_id,
            description,
            nutrients,
        })
    }

    /// Foods matching every search term, in id order
    pub fn search(&self, query: &str, limit: usize) -> ReferenceResult<Vec<ReferenceHit>> {
        self.check_ready()?;
        let terms = search_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables
            .foods
            .iter()
            .filter(|(id, description)| matches_terms(**id, description, &terms))
            .take(limit)
            .map(|(id, description)| ReferenceHit {
                fdc_id: *id,
                description: description.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use crate::models::MISSING;

    const FOODS: &str = r#""fdc_id","data_type","description","food_category_id","publication_date"
"173904","sr_legacy_food","Cereals, oats, regular and quick, not fortified, dry","8","2019-04-01"
"171287","sr_legacy_food","Egg, whole, raw, fresh","1","2019-04-01"
"#;

    const NUTRIENTS: &str = r#""id","fdc_id","nutrient_id","amount","data_points"
"1","173904","1003","13.15","1"
"2","173904","1004","6.52","1"
"3","173904","1008","379","1"
"4","173904","1093","6","1"
"5","171287","1003","12.56","1"
"6","173904","9999","1","1"
"#;

    fn write_tables(dir: &Path) {
        std::fs::write(dir.join(FOOD_FILE), FOODS).unwrap();
        std::fs::write(dir.join(FOOD_NUTRIENT_FILE), NUTRIENTS).unwrap();
    }

    #[test]
    fn test_split_csv_line() {
        assert_eq!(
            split_csv_line(r#""1","a, b","say ""hi""",x"#),
            vec!["1", "a, b", "say \"hi\"", "x"]
        );
        assert_eq!(split_csv_line(""), vec![""]);
    }

    #[test]
    fn test_parse_foods_skips_header() {
        let foods = parse_foods(Cursor::new(FOODS)).unwrap();
        assert_eq!(foods.len(), 2);
        assert_eq!(foods[&171287], "Egg, whole, raw, fresh");
    }

    #[test]
    fn test_parse_food_nutrients() {
        let profiles = parse_food_nutrients(Cursor::new(NUTRIENTS)).unwrap();
        let oats = profiles[&173904];
        assert_eq!(oats.protein, 13.15);
        assert_eq!(oats.energy_kcal, 379.0);
        assert!((oats.salt - 0.015).abs() < 1e-12);
        assert_eq!(oats.energy_kj, MISSING);
        assert_eq!(profiles[&171287].fat, MISSING);
    }

    #[test]
    fn test_reference_not_ready_until_loaded() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(dir.path());
        let reference = FdcReference::new(dir.path());
        assert!(reference.food(173904).is_none());
        assert!(matches!(reference.search("oats", 10), Err(ReferenceError::NotReady)));

        reference.load_blocking().unwrap();
        assert!(reference.is_ready());
        let oats = reference.food(173904).unwrap();
        assert!(oats.description.starts_with("Cereals, oats"));
        assert_eq!(reference.status().food_count, 2);
    }

    #[test]
    fn test_search() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(dir.path());
        let reference = FdcReference::new(dir.path());
        reference.load_blocking().unwrap();

        let hits = reference.search("OATS, dry", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fdc_id, 173904);
        assert_eq!(reference.search("171287", 10).unwrap()[0].description, "Egg, whole, raw, fresh");
        assert!(reference.search("egg oats", 10).unwrap().is_empty());
        assert!(reference.search(" , ", 10).unwrap().is_empty());
    }

    #[test]
    fn test_missing_directory_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let reference = FdcReference::new(dir.path().join("absent"));
        assert!(matches!(reference.load_blocking(), Err(ReferenceError::Io { .. })));
        assert!(!reference.is_ready());
        assert!(matches!(reference.search("oats", 5), Err(ReferenceError::LoadFailed(_))));
        assert!(reference.status().error.is_some());
    }
}
