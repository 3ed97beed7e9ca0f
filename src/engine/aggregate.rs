//! Weighted nutrient aggregation
//!
//! Combines per-100 g profiles of a mixture into one per-100 g profile.

use std::sync::Arc;

use serde::Serialize;

use crate::models::{AbsoluteSelection, Ingredient, Nutrient, NutrientProfile, MISSING};
use super::error::{EngineError, EngineResult, MissingNutrient};

/// Weighted average of a mixture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub profile: NutrientProfile,
    /// Grams of every input, including ingredients skipped for some nutrient
    pub total_grams: f64,
    pub missing: Vec<MissingNutrient>,
}

/// One ingredient's combined share of a selection list
#[derive(Debug, Clone)]
pub(crate) struct MergedSelection<'a> {
    pub ingredient: &'a Arc<Ingredient>,
    pub grams: f64,
    pub append_percent: bool,
}

pub(crate) fn check_weight(ingredient: &str, grams: f64) -> EngineResult<()> {
    if !grams.is_finite() || grams < 0.0 {
        return Err(EngineError::InvalidWeight {
            ingredient: ingredient.to_string(),
            grams,
        });
    }
    Ok(())
}

/// Sum the grams of repeated ingredients, keeping first-seen order
///
/// Each ingredient's parts are added smallest first, so the sum does not
/// depend on the order the duplicates arrived in.
pub(crate) fn merge_selections(
    selections: &[AbsoluteSelection],
) -> EngineResult<Vec<MergedSelection<'_>>> {
    let mut merged: Vec<MergedSelection> = Vec::with_capacity(selections.len());
    let mut parts: Vec<Vec<f64>> = Vec::with_capacity(selections.len());
    for selection in selections {
        check_weight(selection.ingredient_id(), selection.grams)?;
        match merged
            .iter()
            .position(|m| m.ingredient.id == selection.ingredient.id)
        {
            Some(index) => {
                parts[index].push(selection.grams);
                merged[index].append_percent |= selection.append_percent;
            }
            None => {
                parts.push(vec![selection.grams]);
                merged.push(MergedSelection {
                    ingredient: &selection.ingredient,
                    grams: selection.grams,
                    append_percent: selection.append_percent,
                });
            }
        }
    }
    for (entry, mut grams) in merged.iter_mut().zip(parts) {
        if grams.len() > 1 {
            grams.sort_by(f64::total_cmp);
            entry.grams = grams.iter().sum();
        }
    }
    Ok(merged)
}

fn is_usable(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Proportionally weighted nutrient profile of the selections
///
/// Unusable values (the missing sentinel or any other negative) are left out
/// of their nutrient's sum and reported, while the ingredient's weight still
/// counts toward the total. A nutrient no ingredient supplies stays missing.
pub fn aggregate_nutrients(selections: &[AbsoluteSelection]) -> EngineResult<Aggregate> {
    let mut merged = merge_selections(selections)?;
    merged.sort_by(|a, b| a.ingredient.id.cmp(&b.ingredient.id));

    let total_grams: f64 = merged.iter().map(|m| m.grams).sum();
    if merged.is_empty() || total_grams <= 0.0 {
        return Err(EngineError::ZeroTotalWeight);
    }

    let mut profile = NutrientProfile::zero();
    let mut missing = Vec::new();

    for nutrient in Nutrient::ALL {
        let mut sum = 0.0;
        let mut contributors = 0usize;

        for m in &merged {
            let value = m.ingredient.nutrients.get(nutrient);
            if !is_usable(value) {
                tracing::warn!(
                    ingredient = %m.ingredient.id,
                    nutrient = %nutrient,
                    value,
                    "skipping unusable nutrient value"
                );
                missing.push(MissingNutrient {
                    ingredient_id: m.ingredient.id.clone(),
                    ingredient_name: m.ingredient.name.clone(),
                    nutrient,
                    value,
                });
                continue;
            }
            sum += m.grams / total_grams * value;
            contributors += 1;
        }

        profile.set(nutrient, if contributors == 0 { MISSING } else { sum });
    }

    Ok(Aggregate {
        profile,
        total_grams,
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredient(id: &str, values: [f64; 8]) -> Arc<Ingredient> {
        Arc::new(Ingredient::new(id, id, id, 1.0, NutrientProfile::from_values(values)))
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identity_single_ingredient() {
        let values = [1628.0, 389.0, 6.9, 1.2, 66.3, 0.0, 16.9, 0.005];
        let oats = ingredient("001", values);
        for grams in [1.0, 37.5, 600.0] {
            let result = aggregate_nutrients(&[AbsoluteSelection::new(oats.clone(), grams)]).unwrap();
            assert_eq!(result.profile.values(), values);
            assert!(result.missing.is_empty());
        }
    }

    #[test]
    fn test_weighted_average() {
        let a = ingredient("001", [100.0, 20.0, 10.0, 2.0, 50.0, 5.0, 10.0, 1.0]);
        let b = ingredient("002", [300.0, 60.0, 30.0, 6.0, 10.0, 15.0, 0.0, 0.0]);
        let result = aggregate_nutrients(&[
            AbsoluteSelection::new(a, 75.0),
            AbsoluteSelection::new(b, 25.0),
        ])
        .unwrap();
        assert!(close(result.profile.energy_kj, 150.0));
        assert!(close(result.profile.carbohydrates, 40.0));
        assert!(close(result.profile.protein, 7.5));
        assert!(close(result.total_grams, 100.0));
    }

    #[test]
    fn test_convexity() {
        let a = ingredient("001", [1500.0, 358.0, 7.0, 1.2, 60.0, 1.0, 13.0, 0.01]);
        let b = ingredient("002", [200.0, 48.0, 0.3, 0.1, 11.0, 10.0, 0.4, 0.0]);
        let c = ingredient("003", [3700.0, 884.0, 100.0, 14.0, 0.0, 0.0, 0.0, 0.0]);
        let inputs = [a, b, c];
        let result = aggregate_nutrients(&[
            AbsoluteSelection::new(inputs[0].clone(), 412.0),
            AbsoluteSelection::new(inputs[1].clone(), 97.3),
            AbsoluteSelection::new(inputs[2].clone(), 3.1),
        ])
        .unwrap();

        for nutrient in Nutrient::ALL {
            let values: Vec<f64> = inputs.iter().map(|i| i.nutrients.get(nutrient)).collect();
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let v = result.profile.get(nutrient);
            assert!(v >= min - 1e-9 && v <= max + 1e-9, "{} out of range", nutrient);
        }
    }

    #[test]
    fn test_missing_value_skipped_but_weight_counted() {
        let a = ingredient("001", [100.0, 20.0, 10.0, MISSING, 50.0, 5.0, 10.0, 1.0]);
        let b = ingredient("002", [100.0, 20.0, 10.0, 8.0, 50.0, 5.0, 10.0, 1.0]);
        let result = aggregate_nutrients(&[
            AbsoluteSelection::new(a, 50.0),
            AbsoluteSelection::new(b, 50.0),
        ])
        .unwrap();

        // b's saturates diluted over the full 100 g
        assert!(close(result.profile.saturates, 4.0));
        assert!(close(result.profile.fat, 10.0));
        assert_eq!(result.missing.len(), 1);
        assert_eq!(result.missing[0].nutrient, Nutrient::Saturates);
        assert_eq!(result.missing[0].ingredient_id, "001");
    }

    #[test]
    fn test_zero_values_participate() {
        let a = ingredient("001", [0.0; 8]);
        let b = ingredient("002", [10.0; 8]);
        let result = aggregate_nutrients(&[
            AbsoluteSelection::new(a, 50.0),
            AbsoluteSelection::new(b, 50.0),
        ])
        .unwrap();
        assert!(close(result.profile.fat, 5.0));
        assert!(result.missing.is_empty());
    }

    #[test]
    fn test_negative_value_reported_like_missing() {
        let a = ingredient("001", [100.0, 20.0, -3.0, 1.0, 50.0, 5.0, 10.0, 1.0]);
        let result = aggregate_nutrients(&[AbsoluteSelection::new(a, 10.0)]).unwrap();
        assert_eq!(result.profile.fat, MISSING);
        assert_eq!(result.missing[0].value, -3.0);
    }

    #[test]
    fn test_zero_total_and_invalid_weight() {
        assert_eq!(aggregate_nutrients(&[]), Err(EngineError::ZeroTotalWeight));

        let a = ingredient("001", [1.0; 8]);
        assert_eq!(
            aggregate_nutrients(&[AbsoluteSelection::new(a.clone(), 0.0)]),
            Err(EngineError::ZeroTotalWeight)
        );
        assert!(matches!(
            aggregate_nutrients(&[AbsoluteSelection::new(a.clone(), -5.0)]),
            Err(EngineError::InvalidWeight { .. })
        ));
        assert!(matches!(
            aggregate_nutrients(&[AbsoluteSelection::new(a, f64::NAN)]),
            Err(EngineError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_duplicates_merged_and_order_independent() {
        let a = ingredient("001", [123.4, 20.1, 10.7, 2.3, 50.9, 5.1, 10.3, 1.7]);
        let b = ingredient("002", [301.9, 60.2, 30.3, 6.7, 10.1, 15.3, 0.2, 0.03]);
        let c = ingredient("003", [17.0, 4.0, 0.1, 0.0, 3.3, 2.2, 0.9, 0.4]);

        let forward = aggregate_nutrients(&[
            AbsoluteSelection::new(a.clone(), 33.3),
            AbsoluteSelection::new(b.clone(), 12.1),
            AbsoluteSelection::new(c.clone(), 7.7),
            AbsoluteSelection::new(a.clone(), 10.0),
        ])
        .unwrap();
        let reversed = aggregate_nutrients(&[
            AbsoluteSelection::new(a.clone(), 43.3),
            AbsoluteSelection::new(c, 7.7),
            AbsoluteSelection::new(b, 12.1),
        ])
        .unwrap();

        assert!(close(forward.total_grams, reversed.total_grams));
        for nutrient in Nutrient::ALL {
            assert!(close(forward.profile.get(nutrient), reversed.profile.get(nutrient)));
        }
    }

    #[test]
    fn test_duplicate_sums_are_bit_identical_across_orders() {
        let a = ingredient("001", [123.4, 20.1, 10.7, 2.3, 50.9, 5.1, 10.3, 1.7]);
        let b = ingredient("002", [301.9, 60.2, 30.3, 6.7, 10.1, 15.3, 0.2, 0.03]);

        let first = aggregate_nutrients(&[
            AbsoluteSelection::new(a.clone(), 0.1),
            AbsoluteSelection::new(a.clone(), 0.2),
            AbsoluteSelection::new(a.clone(), 0.3),
            AbsoluteSelection::new(b.clone(), 0.7),
        ])
        .unwrap();
        let shuffled = aggregate_nutrients(&[
            AbsoluteSelection::new(a.clone(), 0.3),
            AbsoluteSelection::new(a.clone(), 0.2),
            AbsoluteSelection::new(b, 0.7),
            AbsoluteSelection::new(a, 0.1),
        ])
        .unwrap();

        assert_eq!(first.total_grams.to_bits(), shuffled.total_grams.to_bits());
        assert_eq!(first.profile, shuffled.profile);
    }
}
