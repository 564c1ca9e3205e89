//! Immutable in-memory content index

use std::collections::HashMap;
use std::path::Path;

use bgcoach_core::fingerprint::{fingerprint, to_hex};
use bgcoach_core::L1;

use crate::model::{GrammarItem, Scenario, ScenarioSummary};
use crate::ContentError;

const GRAMMAR_FILE: &str = "grammar_pack.json";
const SCENARIOS_FILE: &str = "scenarios.json";

const CEFR_LEVELS: [&str; 6] = ["A1", "A2", "B1", "B2", "C1", "C2"];

/// Read-only index of grammar items and scenarios.
///
/// Loaded once at startup; concurrent reads need no locking.
#[derive(Debug)]
pub struct ContentStore {
    items: Vec<GrammarItem>,
    by_id: HashMap<String, usize>,
    scenarios: Vec<Scenario>,
    version: String,
}

impl ContentStore {
    /// Load and validate the content documents from a directory.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ContentError> {
        let dir = dir.as_ref();
        let grammar_path = dir.join(GRAMMAR_FILE);
        let scenarios_path = dir.join(SCENARIOS_FILE);

        let grammar_raw = read(&grammar_path)?;
        let scenarios_raw = read(&scenarios_path)?;

        let items: Vec<GrammarItem> = parse(&grammar_path, &grammar_raw)?;
        let scenarios: Vec<Scenario> = parse(&scenarios_path, &scenarios_raw)?;

        let version = to_hex(&fingerprint(&[grammar_raw.as_bytes(), scenarios_raw.as_bytes()]));

        Self::build(items, scenarios, version)
    }

    /// Build a store from already-parsed documents (test path).
    pub fn build(
        items: Vec<GrammarItem>,
        scenarios: Vec<Scenario>,
        version: String,
    ) -> Result<Self, ContentError> {
        let mut errors = Vec::new();
        let mut by_id = HashMap::with_capacity(items.len());

        for (idx, item) in items.iter().enumerate() {
            if !item.id.starts_with("bg.") {
                errors.push(format!("item '{}': id outside the bg.* namespace", item.id));
            }
            if by_id.insert(item.id.clone(), idx).is_some() {
                errors.push(format!("duplicate grammar item id '{}'", item.id));
            }
            for level in &item.levels {
                if !CEFR_LEVELS.contains(&level.as_str()) {
                    errors.push(format!("item '{}': unknown CEFR level '{level}'", item.id));
                }
            }
            for key in item.contrast.keys() {
                if key.parse::<L1>().is_err() {
                    errors.push(format!("item '{}': unsupported L1 key '{key}'", item.id));
                }
            }
            for (i, drill) in item.drills.iter().enumerate() {
                if drill.answer.trim().is_empty() {
                    errors.push(format!("item '{}': drill {i} has an empty answer", item.id));
                }
                if !drill.has_required_marker() {
                    errors.push(format!(
                        "item '{}': drill {i} is missing a blank or bracket marker",
                        item.id
                    ));
                }
            }
            for interval in &item.srs_intervals {
                if *interval == 0 {
                    errors.push(format!("item '{}': SRS intervals must be positive", item.id));
                }
            }
        }

        for scenario in &scenarios {
            for id in scenario
                .grammar
                .primary
                .iter()
                .chain(scenario.grammar.secondary.iter())
            {
                if !by_id.contains_key(id) {
                    errors.push(format!(
                        "scenario '{}': dangling grammar reference '{id}'",
                        scenario.id
                    ));
                }
            }
        }

        if !errors.is_empty() {
            return Err(ContentError::Validation(errors));
        }

        tracing::info!(
            items = items.len(),
            scenarios = scenarios.len(),
            version = %version,
            "Content store loaded"
        );

        Ok(Self {
            items,
            by_id,
            scenarios,
            version,
        })
    }

    /// Look up a grammar item by id.
    pub fn get_item(&self, id: &str) -> Option<&GrammarItem> {
        self.by_id.get(id).map(|&idx| &self.items[idx])
    }

    /// Scenario summaries in insertion order.
    pub fn list_scenarios(&self) -> Vec<ScenarioSummary> {
        self.scenarios.iter().map(ScenarioSummary::from).collect()
    }

    /// Items whose trigger list contains `tag`, insertion order.
    pub fn find_triggers(&self, tag: &str) -> Vec<&GrammarItem> {
        self.items
            .iter()
            .filter(|item| item.triggers.iter().any(|t| t == tag))
            .collect()
    }

    /// Contrastive note for the given L1, when the item carries one.
    pub fn contrast_for<'a>(&self, item: &'a GrammarItem, l1: L1) -> Option<&'a str> {
        item.contrast.get(l1.code()).map(String::as_str)
    }

    /// Content version digest (hex), part of every coach cache key.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn scenario_count(&self) -> usize {
        self.scenarios.len()
    }
}

fn read(path: &Path) -> Result<String, ContentError> {
    std::fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, raw: &str) -> Result<T, ContentError> {
    serde_json::from_str(raw).map_err(|source| ContentError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GrammarBinding;
    use bgcoach_core::coach::{Drill, DrillKind};

    fn item(id: &str, triggers: &[&str]) -> GrammarItem {
        GrammarItem {
            id: id.to_string(),
            title_bg: "Тест".into(),
            levels: vec!["A2".into()],
            micro_explanation_bg: "Обяснение.".into(),
            contrast: [("PL".to_string(), "nota".to_string())].into(),
            examples: Vec::new(),
            drills: vec![Drill {
                kind: DrillKind::Fill,
                prompt: "Искам ___ кафе.".into(),
                answer: "да поръчам".into(),
                hint: None,
                level: None,
                error_tag: None,
            }],
            srs_intervals: vec![1, 3, 7],
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn scenario(id: &str, primary: &[&str]) -> Scenario {
        Scenario {
            id: id.to_string(),
            title: "Сценарий".into(),
            description: String::new(),
            level: "A2".into(),
            turns: Vec::new(),
            grammar: GrammarBinding {
                primary: primary.iter().map(|p| p.to_string()).collect(),
                secondary: Vec::new(),
                method: "curated".into(),
            },
        }
    }

    #[test]
    fn test_build_and_lookups() {
        let store = ContentStore::build(
            vec![item("bg.a.one", &["t1"]), item("bg.a.two", &["t1", "t2"])],
            vec![scenario("s1", &["bg.a.one"])],
            "v1".into(),
        )
        .unwrap();

        assert!(store.get_item("bg.a.one").is_some());
        assert!(store.get_item("bg.missing").is_none());

        let hits = store.find_triggers("t1");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "bg.a.one"); // insertion order

        let item = store.get_item("bg.a.two").unwrap();
        assert_eq!(store.contrast_for(item, L1::Pl), Some("nota"));
        assert_eq!(store.contrast_for(item, L1::Sr), None);
    }

    #[test]
    fn test_duplicate_id_is_fatal() {
        let err = ContentStore::build(
            vec![item("bg.a.one", &[]), item("bg.a.one", &[])],
            Vec::new(),
            "v1".into(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_dangling_scenario_reference_is_fatal() {
        let err = ContentStore::build(
            vec![item("bg.a.one", &[])],
            vec![scenario("s1", &["bg.a.gone"])],
            "v1".into(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("dangling"));
    }

    #[test]
    fn test_bad_contrast_key_is_fatal() {
        let mut bad = item("bg.a.one", &[]);
        bad.contrast.insert("DE".into(), "nicht unterstützt".into());
        let err = ContentStore::build(vec![bad], Vec::new(), "v1".into()).unwrap_err();
        assert!(err.to_string().contains("unsupported L1"));
    }

    #[test]
    fn test_empty_drill_answer_is_fatal() {
        let mut bad = item("bg.a.one", &[]);
        bad.drills[0].answer = "  ".into();
        assert!(ContentStore::build(vec![bad], Vec::new(), "v1".into()).is_err());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let items = vec![item("bg.a.one", &["t1"])];
        let scenarios = vec![scenario("s1", &["bg.a.one"])];
        std::fs::write(
            dir.path().join("grammar_pack.json"),
            serde_json::to_string(&items).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("scenarios.json"),
            serde_json::to_string(&scenarios).unwrap(),
        )
        .unwrap();

        let store = ContentStore::load(dir.path()).unwrap();
        assert_eq!(store.item_count(), 1);
        assert_eq!(store.scenario_count(), 1);
        assert_eq!(store.version().len(), 32);
    }

    #[test]
    fn test_load_missing_directory_is_fatal() {
        assert!(ContentStore::load("/nonexistent/content").is_err());
    }
}
