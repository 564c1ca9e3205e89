//! Coach composition
//!
//! `compose` runs the grammar detector, consults the response cache,
//! calls the chat provider, and assembles the final `CoachResponse`
//! with drills and an L1 contrastive note. Provider failures fall back
//! to a deterministic local reply; the operation itself never errors.

use std::sync::Arc;

use bgcoach_config::LlmConfig;
use bgcoach_content::ContentStore;
use bgcoach_core::coach::{CoachResponse, Correction, Drill};
use bgcoach_core::fingerprint::{fingerprint, FingerprintCache};
use bgcoach_core::L1;
use bgcoach_grammar::fold_for_key;

use crate::provider::{chat_with_deadline, ChatProvider};

/// Fixed system prompt for the chat provider.
const SYSTEM_PROMPT: &str =
    "You are a Bulgarian coach for a Slavic L1. Reply ONLY in Bulgarian. Be concise.";

/// Deterministic acknowledgements.
const FALLBACK_REPLY: &str = "Разбрах.";
const EMPTY_REPLY: &str = "Не те чух.";

/// Coach-response cache capacity.
const CACHE_CAPACITY: usize = 100;

/// At most this many drills are attached per correction.
const MAX_DRILLS_PER_CORRECTION: usize = 2;

/// Composes coach responses for final transcripts.
pub struct CoachComposer {
    provider: Box<dyn ChatProvider>,
    store: Arc<ContentStore>,
    cache: FingerprintCache<CoachResponse>,
    llm: LlmConfig,
}

impl CoachComposer {
    pub fn new(provider: Box<dyn ChatProvider>, store: Arc<ContentStore>, llm: LlmConfig) -> Self {
        Self {
            provider,
            store,
            cache: FingerprintCache::new("coach", CACHE_CAPACITY),
            llm,
        }
    }

    /// Provider name, for health reporting.
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Run the grammar detector only (the `/content/analyze` path).
    pub fn analyze(&self, transcript: &str, l1: L1) -> (Vec<Correction>, Vec<Drill>) {
        let corrections = bgcoach_grammar::detect(transcript, l1, &self.store);
        let drills = self.attach_drills(&corrections);
        (corrections, drills)
    }

    /// Turn a final transcript into a complete coach response.
    pub async fn compose(&self, transcript: &str, l1: L1) -> CoachResponse {
        let trimmed = transcript.trim();
        if trimmed.is_empty() {
            return CoachResponse::plain(EMPTY_REPLY);
        }

        let corrections = bgcoach_grammar::detect(transcript, l1, &self.store);

        // Cache key covers the normalized text, the learner's L1, and
        // the content version, so a content or L1 change never serves a
        // stale contrast note.
        let key = fingerprint(&[
            fold_for_key(transcript).as_bytes(),
            l1.code().as_bytes(),
            self.store.version().as_bytes(),
        ]);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!("coach cache hit");
            return hit;
        }

        let hint = corrections
            .iter()
            .map(|c| c.error_tag.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let reply_bg = match chat_with_deadline(
            self.provider.as_ref(),
            SYSTEM_PROMPT,
            trimmed,
            &hint,
            self.llm.timeout(),
        )
        .await
        {
            Ok(reply) if is_bulgarian(&reply) => reply.trim().to_string(),
            Ok(reply) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    reply_len = reply.len(),
                    "provider reply is not Bulgarian, using fallback"
                );
                FALLBACK_REPLY.to_string()
            }
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), error = %e, "provider call failed, using fallback");
                FALLBACK_REPLY.to_string()
            }
        };

        let drills = self.attach_drills(&corrections);
        let contrastive_note = self.contrastive_note(&corrections, l1);

        let response = CoachResponse {
            reply_bg,
            corrections,
            contrastive_note,
            drills,
        };

        self.cache.put(key, response.clone());
        response
    }

    /// Up to two drills per correction, in the item's declared order,
    /// deduplicated across corrections. Each attached drill carries its
    /// item's id as origin.
    fn attach_drills(&self, corrections: &[Correction]) -> Vec<Drill> {
        let mut drills: Vec<Drill> = Vec::new();

        for correction in corrections {
            if correction.error_tag.is_empty() {
                continue;
            }
            let Some(item) = self.store.get_item(&correction.error_tag) else {
                continue;
            };

            let mut attached = 0;
            for drill in &item.drills {
                if attached >= MAX_DRILLS_PER_CORRECTION {
                    break;
                }
                let duplicate = drills
                    .iter()
                    .any(|d| d.prompt == drill.prompt && d.answer == drill.answer);
                if duplicate {
                    continue;
                }
                let mut drill = drill.clone();
                drill.error_tag = Some(item.id.clone());
                drills.push(drill);
                attached += 1;
            }
        }

        drills
    }

    /// Contrast note for the first correction's item, when present.
    fn contrastive_note(&self, corrections: &[Correction], l1: L1) -> Option<String> {
        let first = corrections.iter().find(|c| !c.error_tag.is_empty())?;
        let item = self.store.get_item(&first.error_tag)?;
        self.store.contrast_for(item, l1).map(str::to_string)
    }

    /// Cached response count, for health reporting.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

/// The reply must be Bulgarian; anything without Cyrillic is rejected.
fn is_bulgarian(text: &str) -> bool {
    text.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{DummyProvider, ProviderError};
    use async_trait::async_trait;
    use bgcoach_content::model::GrammarItem;
    use bgcoach_core::coach::DrillKind;
    use std::collections::BTreeMap;

    struct FailingProvider;

    #[async_trait]
    impl ChatProvider for FailingProvider {
        async fn chat(&self, _: &str, _: &str, _: &str) -> Result<String, ProviderError> {
            Err(ProviderError::Api("HTTP 500".into()))
        }
        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct EnglishProvider;

    #[async_trait]
    impl ChatProvider for EnglishProvider {
        async fn chat(&self, _: &str, _: &str, _: &str) -> Result<String, ProviderError> {
            Ok("Great job, keep going!".into())
        }
        fn name(&self) -> &'static str {
            "english"
        }
    }

    fn da_item() -> GrammarItem {
        GrammarItem {
            id: "bg.no_infinitive.da_present".into(),
            title_bg: "Да-конструкция".into(),
            levels: vec!["A2".into()],
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
            srs_intervals: vec![1, 3, 7],
            triggers: vec!["modal_bare_present".into()],
        }
    }

    fn store() -> Arc<ContentStore> {
        Arc::new(ContentStore::build(vec![da_item()], Vec::new(), "v1".into()).unwrap())
    }

    fn composer(provider: Box<dyn ChatProvider>) -> CoachComposer {
        CoachComposer::new(provider, store(), LlmConfig::default())
    }

    #[tokio::test]
    async fn test_empty_transcript() {
        let composer = composer(Box::new(DummyProvider));
        let response = composer.compose("", L1::Pl).await;
        assert_eq!(response.reply_bg, "Не те чух.");
        assert!(response.corrections.is_empty());
        assert!(response.drills.is_empty());
        assert!(response.contrastive_note.is_none());
    }

    #[tokio::test]
    async fn test_compose_with_detection_and_drills() {
        let composer = composer(Box::new(DummyProvider));
        let response = composer.compose("Искам поръчвам кафе.", L1::Pl).await;

        assert_eq!(response.corrections.len(), 1);
        let correction = &response.corrections[0];
        assert_eq!(correction.error_tag, "bg.no_infinitive.da_present");
        assert_eq!(correction.before, "Искам поръчвам");
        assert_eq!(correction.after, "искам да поръчам");

        // At most two drills per correction, declared order, tagged
        // with the originating item.
        assert_eq!(response.drills.len(), 2);
        assert_eq!(response.drills[0].answer, "да поръчам");
        assert_eq!(
            response.drills[0].error_tag.as_deref(),
            Some("bg.no_infinitive.da_present")
        );

        assert_eq!(
            response.contrastive_note.as_deref(),
            Some("Po polsku bezokolicznik.")
        );
    }

    #[tokio::test]
    async fn test_l1_selects_contrast_note() {
        let composer = composer(Box::new(DummyProvider));
        let response = composer.compose("Искам поръчвам кафе.", L1::Ru).await;
        assert_eq!(
            response.contrastive_note.as_deref(),
            Some("По-русски инфинитив.")
        );

        // Serbian has no note on this item.
        let response = composer.compose("Искам поръчвам кафе.", L1::Sr).await;
        assert!(response.contrastive_note.is_none());
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back() {
        let composer = composer(Box::new(FailingProvider));
        let response = composer.compose("Искам поръчвам кафе.", L1::Pl).await;

        assert!(response.reply_bg.starts_with("Разбрах."));
        // Corrections and drills identical to the healthy path.
        assert_eq!(response.corrections.len(), 1);
        assert_eq!(response.drills.len(), 2);
    }

    #[tokio::test]
    async fn test_non_bulgarian_reply_rejected() {
        let composer = composer(Box::new(EnglishProvider));
        let response = composer.compose("Искам поръчвам кафе.", L1::Pl).await;
        assert_eq!(response.reply_bg, "Разбрах.");
    }

    #[tokio::test]
    async fn test_cache_returns_identical_response() {
        let composer = composer(Box::new(DummyProvider));
        let first = composer.compose("Искам поръчвам кафе.", L1::Pl).await;
        let second = composer.compose("Искам поръчвам кафе.", L1::Pl).await;
        assert_eq!(first, second);
        assert_eq!(composer.cache_len(), 1);
    }

    #[tokio::test]
    async fn test_cache_key_includes_l1() {
        let composer = composer(Box::new(DummyProvider));
        let _ = composer.compose("Искам поръчвам кафе.", L1::Pl).await;
        let _ = composer.compose("Искам поръчвам кафе.", L1::Ru).await;
        assert_eq!(composer.cache_len(), 2);
    }

    #[tokio::test]
    async fn test_clean_transcript_no_corrections() {
        let composer = composer(Box::new(DummyProvider));
        let response = composer.compose("Искам да поръчам кафе.", L1::Pl).await;
        assert!(response.corrections.is_empty());
        assert!(response.drills.is_empty());
        assert!(response.contrastive_note.is_none());
        assert!(is_bulgarian(&response.reply_bg));
    }

    #[test]
    fn test_analyze_is_pure() {
        let composer = composer(Box::new(DummyProvider));
        let (c1, d1) = composer.analyze("Искам поръчвам кафе.", L1::Pl);
        let (c2, d2) = composer.analyze("Искам поръчвам кафе.", L1::Pl);
        assert_eq!(c1, c2);
        assert_eq!(d1, d2);
        assert!(d1.len() <= 2 * c1.len());
    }
}
