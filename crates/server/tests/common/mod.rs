//! Shared test fixtures
//!
//! Builds the full router over an in-memory content pack. ASR points at
//! a missing model and TTS at a missing binary so the degraded paths
//! run deterministically and no external tooling is required.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;

use bgcoach_coach::{build_provider, CoachComposer};
use bgcoach_config::{AsrConfig, Settings, TtsConfig};
use bgcoach_content::model::{GrammarBinding, GrammarItem, Scenario};
use bgcoach_content::ContentStore;
use bgcoach_core::coach::{Drill, DrillKind};
use bgcoach_pipeline::{AsrEngine, TtsEngine};
use bgcoach_server::{create_router, AppState};

pub fn content() -> Arc<ContentStore> {
    let item = GrammarItem {
        id: "bg.no_infinitive.da_present".into(),
        title_bg: "Да-конструкция".into(),
        levels: vec!["A1".into(), "A2".into()],
        micro_explanation_bg: "Използвай да + сегашно време.".into(),
        contrast: BTreeMap::from([
            ("PL".to_string(), "Po polsku bezokolicznik.".to_string()),
            ("RU".to_string(), "По-русски инфинитив.".to_string()),
        ]),
        examples: Vec::new(),
        drills: vec![
            Drill {
                kind: DrillKind::Fill,
                prompt: "Искам ___ кафе.".into(),
                answer: "да поръчам".into(),
                hint: None,
                level: None,
                error_tag: None,
            },
            Drill {
                kind: DrillKind::Transform,
                prompt: "Преобразувай: „Мога помагам.“".into(),
                answer: "Мога да помогна.".into(),
                hint: None,
                level: None,
                error_tag: None,
            },
            Drill {
                kind: DrillKind::Reorder,
                prompt: "[да] [искам] [поръчам]".into(),
                answer: "Искам да поръчам.".into(),
                hint: None,
                level: None,
                error_tag: None,
            },
        ],
        srs_intervals: vec![1, 3, 7, 21],
        triggers: vec!["modal_bare_present".into()],
    };
    let scenario = Scenario {
        id: "cafe_order".into(),
        title: "В кафенето".into(),
        description: "Поръчка на кафе".into(),
        level: "A1".into(),
        turns: vec!["Добър ден!".into()],
        grammar: GrammarBinding {
            primary: vec!["bg.no_infinitive.da_present".into()],
            secondary: Vec::new(),
            method: "curated".into(),
        },
    };
    Arc::new(ContentStore::build(vec![item], vec![scenario], "itest-v1".into()).unwrap())
}

pub fn app() -> Router {
    let settings = Settings {
        asr: AsrConfig {
            model_dir: "/nonexistent".into(),
            ..AsrConfig::default()
        },
        tts: TtsConfig {
            binary_path: "/nonexistent/espeak-ng".into(),
            ..TtsConfig::default()
        },
        ..Settings::default()
    };
    let content = content();
    let asr = Arc::new(AsrEngine::new(settings.asr.clone(), 1));
    let tts = Arc::new(TtsEngine::new(settings.tts.clone()));
    let composer = Arc::new(CoachComposer::new(
        build_provider(&settings.llm),
        content.clone(),
        settings.llm.clone(),
    ));
    create_router(AppState::new(settings, content, asr, tts, composer))
}
