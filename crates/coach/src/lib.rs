//! Coach composition and pluggable chat providers
//!
//! Turns a final transcript into a complete `CoachResponse`: grammar
//! detection, a cached provider call, drill attachment, and an
//! L1-specific contrastive note. Provider outages degrade to a
//! deterministic local reply so the session never hangs.

pub mod composer;
pub mod provider;

pub use composer::CoachComposer;
pub use provider::{
    build_provider, ChatProvider, ClaudeClient, DummyProvider, OpenAiClient, ProviderError,
};

impl From<ProviderError> for bgcoach_core::Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout(ms) => bgcoach_core::Error::Timeout(ms),
            other => bgcoach_core::Error::Upstream(other.to_string()),
        }
    }
}
