//! Recipe ratio resolution
//!
//! Converts between keystone-relative recipes and absolute selections.

use crate::models::{AbsoluteSelection, RatioSelection, Recipe};
use super::aggregate::{check_weight, merge_selections};
use super::error::{EngineError, EngineResult};

/// Keystone and ratios derived from absolute selections
#[derive(Debug, Clone, PartialEq)]
pub struct RatioSplit {
    /// Grams of the keystone in one unit
    pub keystone: AbsoluteSelection,
    pub selections: Vec<RatioSelection>,
}

pub(crate) fn check_keystone_grams(ingredient: &str, grams: f64) -> EngineResult<()> {
    if !grams.is_finite() || grams <= 0.0 {
        return Err(EngineError::InvalidKeystone(format!(
            "keystone {} must weigh more than 0 g, got {}",
            ingredient, grams
        )));
    }
    Ok(())
}

/// Absolute grams for `batch` units of a recipe
///
/// Ratio selections come first in recipe order, followed by the keystone.
pub fn resolve_recipe(recipe: &Recipe, batch: u32) -> EngineResult<Vec<AbsoluteSelection>> {
    if batch == 0 {
        return Err(EngineError::InvalidUnitCount);
    }
    let keystone = recipe.keystone();
    check_keystone_grams(keystone.ingredient_id(), keystone.grams)?;

    let mut resolved: Vec<AbsoluteSelection> = recipe
        .selections()
        .iter()
        .map(|s| AbsoluteSelection {
            ingredient: s.ingredient.clone(),
            grams: s.grams_for(keystone.grams, batch),
            append_percent: s.append_percent,
        })
        .collect();

    resolved.push(AbsoluteSelection {
        ingredient: keystone.ingredient.clone(),
        grams: keystone.grams * f64::from(batch),
        append_percent: keystone.append_percent,
    });

    Ok(resolved)
}

/// Express absolute selections relative to a chosen keystone
///
/// The keystone's grams are divided by `batch` to give the weight in one
/// unit; every other ratio is its grams over the keystone's grams, so the
/// batch count cancels out. Repeated ingredients are summed first.
pub fn ratios_from_selections(
    selections: &[AbsoluteSelection],
    keystone_id: &str,
    batch: u32,
) -> EngineResult<RatioSplit> {
    if batch == 0 {
        return Err(EngineError::InvalidUnitCount);
    }
    let merged = merge_selections(selections)?;

    let keystone = merged
        .iter()
        .find(|m| m.ingredient.id == keystone_id)
        .ok_or_else(|| {
            EngineError::InvalidKeystone(format!("{} is not among the selections", keystone_id))
        })?;
    check_keystone_grams(keystone_id, keystone.grams)?;

    let ratios = merged
        .iter()
        .filter(|m| m.ingredient.id != keystone_id)
        .map(|m| {
            check_weight(&m.ingredient.id, m.grams)?;
            Ok(RatioSelection {
                ingredient: m.ingredient.clone(),
                ratio: m.grams / keystone.grams,
                append_percent: m.append_percent,
            })
        })
        .collect::<EngineResult<Vec<_>>>()?;

    Ok(RatioSplit {
        keystone: AbsoluteSelection {
            ingredient: keystone.ingredient.clone(),
            grams: keystone.grams / f64::from(batch),
            append_percent: keystone.append_percent,
        },
        selections: ratios,
    })
}

/// The first selection flagged for a percentage, the usual keystone choice
pub fn suggest_keystone(selections: &[AbsoluteSelection]) -> Option<&AbsoluteSelection> {
    selections.iter().find(|s| s.append_percent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::models::{Ingredient, NutrientProfile};

    fn ingredient(id: &str) -> Arc<Ingredient> {
        Arc::new(Ingredient::new(id, id, id, 1.0, NutrientProfile::zero()))
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_ratio_round_trip() {
        let oats = ingredient("001");
        let milk = ingredient("002");
        let split = ratios_from_selections(
            &[
                AbsoluteSelection::new(oats.clone(), 60.0).with_percent(),
                AbsoluteSelection::new(milk.clone(), 30.0),
            ],
            "001",
            1,
        )
        .unwrap();
        assert!(close(split.selections[0].ratio, 0.5));
        assert!(split.keystone.append_percent);

        let recipe = Recipe::new("Overnight oats", split.keystone, split.selections).unwrap();
        let resolved = resolve_recipe(&recipe, 1).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].ingredient_id(), "002");
        assert!(close(resolved[0].grams, 30.0));
        assert_eq!(resolved[1].ingredient_id(), "001");
        assert!(close(resolved[1].grams, 60.0));
    }

    #[test]
    fn test_batch_divides_keystone_and_cancels_in_ratios() {
        let split = ratios_from_selections(
            &[
                AbsoluteSelection::new(ingredient("001"), 600.0),
                AbsoluteSelection::new(ingredient("002"), 150.0).with_percent(),
            ],
            "001",
            10,
        )
        .unwrap();
        assert!(close(split.keystone.grams, 60.0));
        assert!(close(split.selections[0].ratio, 0.25));
        assert!(split.selections[0].append_percent);
    }

    #[test]
    fn test_resolve_scales_by_batch() {
        let recipe = Recipe::new(
            "Porridge",
            AbsoluteSelection::new(ingredient("001"), 50.0),
            vec![RatioSelection::new(ingredient("002"), 2.0)],
        )
        .unwrap();
        let resolved = resolve_recipe(&recipe, 3).unwrap();
        assert!(close(resolved[0].grams, 300.0));
        assert!(close(resolved[1].grams, 150.0));
        assert_eq!(resolve_recipe(&recipe, 0), Err(EngineError::InvalidUnitCount));
    }

    #[test]
    fn test_invalid_keystone() {
        let selections = [
            AbsoluteSelection::new(ingredient("001"), 0.0),
            AbsoluteSelection::new(ingredient("002"), 10.0),
        ];
        assert!(matches!(
            ratios_from_selections(&selections, "001", 1),
            Err(EngineError::InvalidKeystone(_))
        ));
        assert!(matches!(
            ratios_from_selections(&selections, "404", 1),
            Err(EngineError::InvalidKeystone(_))
        ));
        assert_eq!(
            ratios_from_selections(&selections, "002", 0),
            Err(EngineError::InvalidUnitCount)
        );
    }

    #[test]
    fn test_suggest_keystone() {
        let selections = [
            AbsoluteSelection::new(ingredient("001"), 10.0),
            AbsoluteSelection::new(ingredient("002"), 20.0).with_percent(),
            AbsoluteSelection::new(ingredient("003"), 30.0).with_percent(),
        ];
        assert_eq!(suggest_keystone(&selections).map(|s| s.ingredient_id()), Some("002"));
        assert!(suggest_keystone(&selections[..1]).is_none());
    }
}
