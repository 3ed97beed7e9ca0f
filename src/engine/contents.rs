//! Contents list formatting
//!
//! Orders visible ingredients by weight, folds grouped ingredients into one
//! entry and leaves suppressed ingredients out.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{AbsoluteSelection, GroupingId, GroupingLabels};
use super::aggregate::merge_selections;
use super::error::{EngineError, EngineResult};

/// One printed entry of a contents list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentsEntry {
    pub text: String,
    pub grams: f64,
    pub show_percent: bool,
    /// Set when the entry stands for a grouping
    pub grouping: Option<GroupingId>,
}

/// Sorted contents entries with the weight percentages are taken against
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentsList {
    pub entries: Vec<ContentsEntry>,
    /// Weight of all selections, suppressed ones included
    pub total_grams: f64,
}

impl ContentsList {
    /// Truncated percentage of an entry
    pub fn percent_of(&self, entry: &ContentsEntry) -> i64 {
        if self.total_grams <= 0.0 {
            return 0;
        }
        (100.0 * entry.grams / self.total_grams) as i64
    }

    /// Comma separated entries terminated by a full stop
    pub fn render(&self) -> String {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|entry| {
                if entry.show_percent {
                    format!("{} {}%", entry.text, self.percent_of(entry))
                } else {
                    entry.text.clone()
                }
            })
            .collect();
        format!("{}.", parts.join(", "))
    }
}

/// Build the sorted contents list for the selections
pub fn build_contents(
    selections: &[AbsoluteSelection],
    groupings: &GroupingLabels,
) -> EngineResult<ContentsList> {
    let merged = merge_selections(selections)?;
    let total_grams: f64 = merged.iter().map(|m| m.grams).sum();

    let mut entries = Vec::new();
    let mut grouped: BTreeMap<GroupingId, f64> = BTreeMap::new();

    for m in &merged {
        if m.ingredient.is_hidden() {
            continue;
        }
        match m.ingredient.display_grouping() {
            Some(grouping) => *grouped.entry(grouping).or_insert(0.0) += m.grams,
            None => entries.push(ContentsEntry {
                text: m.ingredient.label_text.clone(),
                grams: m.grams,
                show_percent: m.append_percent,
                grouping: None,
            }),
        }
    }

    for (grouping, grams) in grouped {
        let text = groupings
            .get(&grouping)
            .ok_or(EngineError::UnknownGrouping(grouping))?;
        if grams > 0.0 {
            entries.push(ContentsEntry {
                text: text.clone(),
                grams,
                show_percent: false,
                grouping: Some(grouping),
            });
        }
    }

    // stable: ties keep insertion order
    entries.sort_by(|a, b| b.grams.total_cmp(&a.grams));

    Ok(ContentsList {
        entries,
        total_grams,
    })
}

/// Rendered contents string for the selections
pub fn contents_text(
    selections: &[AbsoluteSelection],
    groupings: &GroupingLabels,
) -> EngineResult<String> {
    Ok(build_contents(selections, groupings)?.render())
}
