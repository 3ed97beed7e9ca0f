//! Label templating
//!
//! Merges engine figures with a label set into the texts printed on a label.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::engine::LabelFigures;
use crate::models::{AbsoluteSelection, LabelSet};
use super::facts::{nutrition_facts, FactsLanguage};
use super::number_format::NumberFormat;

/// Placeholder in additional info replaced by the unit weight
pub const WEIGHT_TOKEN: &str = "%WEIGHT%";

const MARKERS: [&str; 2] = ["**", "__"];

/// The blocks of one label, still carrying inline markup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelText {
    pub heading: String,
    pub subheading: String,
    pub contents: String,
    pub nutrition: String,
    pub footer: String,
    pub expiry: String,
}

impl LabelText {
    /// The same blocks with markup removed
    pub fn plain(&self) -> LabelText {
        LabelText {
            heading: strip_markup(&self.heading),
            subheading: strip_markup(&self.subheading),
            contents: strip_markup(&self.contents),
            nutrition: strip_markup(&self.nutrition),
            footer: strip_markup(&self.footer),
            expiry: self.expiry.clone(),
        }
    }
}

/// Remove `**` and `__` markers
pub fn strip_markup(text: &str) -> String {
    MARKERS
        .iter()
        .fold(text.to_string(), |acc, marker| acc.replace(marker, ""))
}

/// Replace every weight placeholder
pub fn substitute_weight(text: &str, grams: u32) -> String {
    text.replace(WEIGHT_TOKEN, &grams.to_string())
}

/// `dd-mm-yyyy` date `days` after `today`
pub fn expiry_date(today: NaiveDate, days: u32) -> String {
    today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
        .format("%d-%m-%Y")
        .to_string()
}

/// Visible selections with nothing to print in the contents list
pub fn label_warnings(selections: &[AbsoluteSelection]) -> Vec<String> {
    let mut warnings = Vec::new();
    for selection in selections {
        let ingredient = &selection.ingredient;
        if ingredient.needs_label_text() && ingredient.label_text.trim().is_empty() {
            let warning = format!(
                "{} ({}) has no label text and will print as an empty entry",
                ingredient.name, ingredient.id
            );
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
        }
    }
    warnings
}

/// Options for composing label text
#[derive(Debug, Clone, Copy)]
pub struct ComposeOptions {
    pub format: NumberFormat,
    pub language: FactsLanguage,
    pub today: NaiveDate,
    /// Overrides the label set's days to expiry
    pub expiry_days: Option<u32>,
}

/// Build the label blocks from engine figures and an optional label set
pub fn compose(figures: &LabelFigures, label_set: Option<&LabelSet>, options: &ComposeOptions) -> LabelText {
    let calculated_weight = figures
        .unit
        .as_ref()
        .map(|u| u.weight)
        .unwrap_or_else(|| figures.total_grams.floor() as u32);
    // The unit weight line belongs to previews, never to the printed label
    let facts = nutrition_facts(&figures.nutrients, &options.format, options.language, None);
    let contents = figures.contents.render();

    match label_set {
        Some(set) => {
            let weight = set.unit_weight_override.unwrap_or(calculated_weight);
            let days = options.expiry_days.unwrap_or(set.days_to_expiry);
            LabelText {
                heading: set.main_title.clone(),
                subheading: set.sub_title.clone(),
                contents: format!("{}{}", set.contents_prefix, contents),
                nutrition: format!("{}{}", set.nutrition_prefix, facts),
                footer: substitute_weight(&set.additional_info, weight),
                expiry: expiry_date(options.today, days),
            }
        }
        None => LabelText {
            heading: String::new(),
            subheading: String::new(),
            contents,
            nutrition: facts,
            footer: String::new(),
            expiry: expiry_date(options.today, options.expiry_days.unwrap_or(1)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::engine::compute_label;
    use crate::models::{GroupingId, GroupingLabels, Ingredient, NutrientProfile};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 27).unwrap()
    }

    fn options() -> ComposeOptions {
        ComposeOptions {
            format: NumberFormat::comma(),
            language: FactsLanguage::Cs,
            today: today(),
            expiry_days: None,
        }
    }

    fn figures(units: Option<u32>) -> LabelFigures {
        let oats = Ingredient::new("001", "Oats", "ovesné vločky", 1.0, NutrientProfile::zero());
        let milk = Ingredient::new("002", "Milk", "mléko", 1.0, NutrientProfile::zero());
        let selections = vec![
            AbsoluteSelection::new(Arc::new(oats), 400.0).with_percent(),
            AbsoluteSelection::new(Arc::new(milk), 500.0),
        ];
        let mut labels = GroupingLabels::new();
        labels.insert(GroupingId::HIDDEN, String::new());
        compute_label(&selections, &labels, units).unwrap()
    }

    fn label_set() -> LabelSet {
        LabelSet {
            main_title: "**OVESNÉ VLOČKY**".into(),
            contents_prefix: "__Složení:__ ".into(),
            additional_info: "Hmotnost: %WEIGHT%g".into(),
            days_to_expiry: 3,
            ..LabelSet::new("overnight")
        }
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("**bold** and __under__"), "bold and under");
        assert_eq!(strip_markup("a*b_c"), "a*b_c");
    }

    #[test]
    fn test_substitute_weight() {
        assert_eq!(substitute_weight("%WEIGHT%g, net %WEIGHT%g", 300), "300g, net 300g");
        assert_eq!(substitute_weight("%WEIGHT", 300), "%WEIGHT");
    }

    #[test]
    fn test_expiry_date() {
        assert_eq!(expiry_date(today(), 3), "01-03-2024");
        assert_eq!(expiry_date(today(), 0), "27-02-2024");
    }

    #[test]
    fn test_compose_uses_calculated_weight() {
        let text = compose(&figures(Some(3)), Some(&label_set()), &options());
        assert_eq!(text.contents, "__Složení:__ mléko, ovesné vločky 44%.");
        assert_eq!(text.footer, "Hmotnost: 300g");
        assert_eq!(text.expiry, "01-03-2024");
        assert!(!text.nutrition.contains("Unit weight"));
        assert!(text.nutrition.ends_with("g."));
        assert_eq!(text.plain().heading, "OVESNÉ VLOČKY");
    }

    #[test]
    fn test_compose_weight_override_and_expiry_override() {
        let mut set = label_set();
        set.unit_weight_override = Some(250);
        let opts = ComposeOptions {
            expiry_days: Some(0),
            ..options()
        };
        let text = compose(&figures(None), Some(&set), &opts);
        assert_eq!(text.footer, "Hmotnost: 250g");
        assert_eq!(text.expiry, "27-02-2024");
        assert!(!text.nutrition.contains("Unit weight"));
    }

    #[test]
    fn test_compose_without_units_uses_total_weight() {
        let text = compose(&figures(None), Some(&label_set()), &options());
        assert_eq!(text.footer, "Hmotnost: 900g");
    }

    #[test]
    fn test_label_warnings() {
        let blank = Ingredient::new("003", "Water", "", 0.0, NutrientProfile::zero());
        let hidden_blank = Ingredient::new("004", "Ice", "", 0.0, NutrientProfile::zero())
            .with_grouping(GroupingId::HIDDEN);
        let selections = vec![
            AbsoluteSelection::new(Arc::new(blank), 10.0),
            AbsoluteSelection::new(Arc::new(hidden_blank), 10.0),
        ];
        let warnings = label_warnings(&selections);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Water (003)"));
    }
}
