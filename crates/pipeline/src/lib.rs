//! Audio pipeline: VAD gate, streaming ASR, and TTS
//!
//! This crate provides the three audio-facing stages:
//! - VAD gate: frames live PCM into one bounded utterance buffer
//! - ASR engine: whisper-backed partials and finalization with caching
//! - TTS engine: streaming WAV synthesis via an external synthesizer

pub mod asr;
pub mod tts;
pub mod vad;

pub use asr::AsrEngine;
pub use tts::{profile_listing, wav_header, Synthesis, TtsEngine, VoiceProfile, MAX_TEXT_CHARS, PROFILES};
pub use vad::{SpeechClassifier, VadEvent, VadGate, WebRtcClassifier};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("bad frame: {0}")]
    BadFrame(String),

    #[error("VAD error: {0}")]
    Vad(String),

    #[error("ASR error: {0}")]
    Asr(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("text too long: {0} > {1} characters")]
    TextTooLong(usize, usize),

    #[error("timeout after {0} ms")]
    Timeout(u64),

    #[error("channel closed")]
    ChannelClosed,
}

impl From<PipelineError> for bgcoach_core::Error {
    fn from(err: PipelineError) -> Self {
        use bgcoach_core::Error;
        match err {
            PipelineError::BadFrame(msg) => Error::InputValidation(msg),
            PipelineError::TextTooLong(got, max) => {
                Error::InputValidation(format!("text too long: {got} > {max} characters"))
            }
            PipelineError::Timeout(ms) => Error::Timeout(ms),
            PipelineError::ChannelClosed => Error::Cancelled,
            PipelineError::Vad(msg) | PipelineError::Asr(msg) | PipelineError::Tts(msg) => {
                Error::Upstream(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let core: bgcoach_core::Error = PipelineError::BadFrame("639 bytes".into()).into();
        assert!(matches!(core, bgcoach_core::Error::InputValidation(_)));

        let core: bgcoach_core::Error = PipelineError::Asr("decoder".into()).into();
        assert!(matches!(core, bgcoach_core::Error::Upstream(_)));

        let core: bgcoach_core::Error = PipelineError::ChannelClosed.into();
        assert!(matches!(core, bgcoach_core::Error::Cancelled));
    }
}
