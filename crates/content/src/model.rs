//! Content data model
//!
//! JSON shapes for the grammar pack and scenarios. Arrays keep insertion
//! order; unknown fields are ignored on read and omitted on write.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use bgcoach_core::coach::Drill;

/// A (wrong, right) example pair on a grammar item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemExample {
    pub wrong: String,
    pub right: String,
}

/// One item in the closed `bg.<category>.<form>` taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarItem {
    /// Globally unique id, e.g. `bg.no_infinitive.da_present`.
    pub id: String,
    /// Bulgarian title.
    pub title_bg: String,
    /// CEFR levels this item belongs to (subset of A1..C2).
    #[serde(default)]
    pub levels: Vec<String>,
    /// Micro-explanation in Bulgarian; reused as the correction note.
    pub micro_explanation_bg: String,
    /// L1 code -> contrastive note. Keys are drawn from the supported L1
    /// set; a BTreeMap keeps serialization deterministic.
    #[serde(default)]
    pub contrast: BTreeMap<String, String>,
    /// Ordered (wrong, right) example pairs.
    #[serde(default)]
    pub examples: Vec<ItemExample>,
    /// Ordered drills.
    #[serde(default)]
    pub drills: Vec<Drill>,
    /// SRS interval vector in days, consumed by the client scheduler.
    #[serde(default)]
    pub srs_intervals: Vec<u32>,
    /// Trigger tags consumed by the grammar detector.
    #[serde(default)]
    pub triggers: Vec<String>,
}

/// How a scenario's grammar binding was produced.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarBinding {
    /// Primary grammar item ids.
    #[serde(default)]
    pub primary: Vec<String>,
    /// Secondary grammar item ids.
    #[serde(default)]
    pub secondary: Vec<String>,
    /// Binding-method label, e.g. `curated`.
    #[serde(default)]
    pub method: String,
}

/// A conversation scenario with bound grammar items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// CEFR level label.
    pub level: String,
    /// Ordered dialogue turns in Bulgarian.
    #[serde(default)]
    pub turns: Vec<String>,
    #[serde(default)]
    pub grammar: GrammarBinding,
}

/// Reduced scenario shape for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub id: String,
    pub title: String,
    pub level: String,
    /// Primary grammar item ids only.
    pub primary: Vec<String>,
}

impl From<&Scenario> for ScenarioSummary {
    fn from(s: &Scenario) -> Self {
        Self {
            id: s.id.clone(),
            title: s.title.clone(),
            level: s.level.clone(),
            primary: s.grammar.primary.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item_json() -> &'static str {
        r#"{
            "id": "bg.future.shte",
            "title_bg": "Бъдеще време с ще",
            "levels": ["A1", "A2"],
            "micro_explanation_bg": "Бъдеще време се образува с ще + сегашно време.",
            "contrast": {"PL": "Po polsku: będę + bezokolicznik.", "RU": "По-русски: буду + инфинитив."},
            "examples": [{"wrong": "утре ходя", "right": "утре ще ходя"}],
            "drills": [
                {"type": "fill", "prompt": "Утре ___ отида на работа.", "answer": "ще"}
            ],
            "srs_intervals": [1, 3, 7, 21],
            "triggers": ["future_no_shte"]
        }"#
    }

    #[test]
    fn test_item_parse_serialize_parse_is_stable() {
        let item: GrammarItem = serde_json::from_str(sample_item_json()).unwrap();
        let json = serde_json::to_string(&item).unwrap();
        let reparsed: GrammarItem = serde_json::from_str(&json).unwrap();
        assert_eq!(item, reparsed);
    }

    #[test]
    fn test_item_ignores_unknown_fields() {
        let json = r#"{
            "id": "bg.x.y",
            "title_bg": "X",
            "micro_explanation_bg": "Y",
            "legacy_field": true
        }"#;
        let item: GrammarItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, "bg.x.y");
        assert!(item.drills.is_empty());
    }

    #[test]
    fn test_scenario_summary_carries_primary_only() {
        let scenario = Scenario {
            id: "cafe".into(),
            title: "В кафенето".into(),
            description: "Поръчка на кафе".into(),
            level: "A2".into(),
            turns: vec!["Добър ден!".into()],
            grammar: GrammarBinding {
                primary: vec!["bg.no_infinitive.da_present".into()],
                secondary: vec!["bg.future.shte".into()],
                method: "curated".into(),
            },
        };
        let summary = ScenarioSummary::from(&scenario);
        assert_eq!(summary.primary, vec!["bg.no_infinitive.da_present"]);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("secondary"));
    }
}
