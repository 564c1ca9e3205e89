//! Shared application state

use std::sync::Arc;

use parking_lot::RwLock;

use bgcoach_coach::CoachComposer;
use bgcoach_config::Settings;
use bgcoach_content::ContentStore;
use bgcoach_core::L1;
use bgcoach_pipeline::{AsrEngine, TtsEngine};

/// State handed to every handler and session.
///
/// Engines and the content store are process-wide and read-only; the
/// only mutable slot is the default L1 for new sessions.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub content: Arc<ContentStore>,
    pub asr: Arc<AsrEngine>,
    pub tts: Arc<TtsEngine>,
    pub composer: Arc<CoachComposer>,
    default_l1: Arc<RwLock<L1>>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        content: Arc<ContentStore>,
        asr: Arc<AsrEngine>,
        tts: Arc<TtsEngine>,
        composer: Arc<CoachComposer>,
    ) -> Self {
        let default_l1 = Arc::new(RwLock::new(settings.default_l1));
        Self {
            settings: Arc::new(settings),
            content,
            asr,
            tts,
            composer,
            default_l1,
        }
    }

    /// Default L1 used for new sessions.
    pub fn default_l1(&self) -> L1 {
        *self.default_l1.read()
    }

    /// Update the process default L1.
    pub fn set_default_l1(&self, l1: L1) {
        *self.default_l1.write() = l1;
        tracing::info!(l1 = %l1, "default L1 updated");
    }
}
