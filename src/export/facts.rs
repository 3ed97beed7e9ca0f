//! Nutrition facts paragraph

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Nutrient, NutrientProfile};
use super::number_format::NumberFormat;

/// Wording of the nutrition facts paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactsLanguage {
    #[default]
    Cs,
    En,
}

impl FromStr for FactsLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cs" | "cz" | "czech" => Ok(FactsLanguage::Cs),
            "en" | "english" => Ok(FactsLanguage::En),
            other => Err(format!("Unknown facts language: {}", other)),
        }
    }
}

struct Figures {
    kj: String,
    kcal: String,
    fat: String,
    saturates: String,
    carbohydrates: String,
    sugars: String,
    protein: String,
    salt: String,
}

fn figures(profile: &NutrientProfile, format: &NumberFormat) -> Figures {
    // an aggregate nobody supplied a value for stays missing
    let render = |nutrient: Nutrient, digits: Option<usize>| {
        if profile.is_missing(nutrient) {
            return "-".to_string();
        }
        let value = profile.get(nutrient);
        match digits {
            Some(digits) => format.format(value, digits),
            None => format.format_whole(value),
        }
    };

    Figures {
        kj: render(Nutrient::EnergyKj, None),
        kcal: render(Nutrient::EnergyKcal, None),
        fat: render(Nutrient::Fat, Some(1)),
        saturates: render(Nutrient::Saturates, Some(1)),
        carbohydrates: render(Nutrient::Carbohydrates, Some(1)),
        sugars: render(Nutrient::Sugars, Some(1)),
        protein: render(Nutrient::Protein, Some(1)),
        salt: render(Nutrient::Salt, Some(3)),
    }
}

/// Nutrition facts per 100 g, with the unit weight appended when known
pub fn nutrition_facts(
    profile: &NutrientProfile,
    format: &NumberFormat,
    language: FactsLanguage,
    unit_weight: Option<u32>,
) -> String {
    let f = figures(profile, format);
    let mut text = match language {
        FactsLanguage::Cs => format!(
            "energie {} kJ / {} kcal, tuky {} g (z toho nasyc.mast.kys. {} g), sacharidy {} g (z toho cukry {} g), bílkoviny {} g, sůl {} g.",
            f.kj, f.kcal, f.fat, f.saturates, f.carbohydrates, f.sugars, f.protein, f.salt
        ),
        FactsLanguage::En => format!(
            "energy {} kJ / {} kcal, fat {} g (of which saturates {} g), carbohydrates {} g (of which sugars {} g), protein {} g, salt {} g.",
            f.kj, f.kcal, f.fat, f.saturates, f.carbohydrates, f.sugars, f.protein, f.salt
        ),
    };

    if let Some(weight) = unit_weight {
        text.push_str(&format!("\nUnit weight: {}g", weight));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MISSING;

    fn oats() -> NutrientProfile {
        NutrientProfile::from_values([1628.7, 389.2, 6.94, 1.2, 66.3, 0.0, 16.9, 0.0125])
    }

    #[test]
    fn test_czech_wording() {
        let text = nutrition_facts(&oats(), &NumberFormat::comma(), FactsLanguage::Cs, None);
        assert_eq!(
            text,
            "energie 1628 kJ / 389 kcal, tuky 6,9 g (z toho nasyc.mast.kys. 1,2 g), sacharidy 66,3 g (z toho cukry 0 g), bílkoviny 16,9 g, sůl 0,013 g."
        );
    }

    #[test]
    fn test_english_wording_with_unit_weight() {
        let text = nutrition_facts(&oats(), &NumberFormat::point(), FactsLanguage::En, Some(300));
        assert!(text.starts_with("energy 1628 kJ / 389 kcal, fat 6.9 g (of which saturates 1.2 g)"));
        assert!(text.ends_with("salt 0.013 g.\nUnit weight: 300g"));
    }

    #[test]
    fn test_missing_rendered_as_dash() {
        let mut profile = oats();
        profile.sugars = MISSING;
        let text = nutrition_facts(&profile, &NumberFormat::comma(), FactsLanguage::Cs, None);
        assert!(text.contains("(z toho cukry - g)"));
    }

    #[test]
    fn test_language_parse() {
        assert_eq!("EN".parse::<FactsLanguage>().unwrap(), FactsLanguage::En);
        assert_eq!("cs".parse::<FactsLanguage>().unwrap(), FactsLanguage::Cs);
        assert!("de".parse::<FactsLanguage>().is_err());
    }
}
