//! Transcript types emitted by the ASR engine

use serde::{Deserialize, Serialize};

/// Best-effort transcript for a still-open utterance.
///
/// Partials are cheap and disposable; confidence is not computed for
/// them and serializes as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialTranscript {
    pub text: String,
    pub confidence: Option<f32>,
}

impl PartialTranscript {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }
}

/// Authoritative transcript for one complete utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalTranscript {
    /// Transcribed text, empty when nothing was recognized.
    pub text: String,
    /// `exp(mean segment logprob)` clamped to [0, 1].
    pub confidence: f32,
    /// Duration of the source audio in milliseconds.
    pub duration_ms: u64,
    /// True when served from the transcription cache.
    #[serde(default)]
    pub cached: bool,
    /// Set when the underlying engine failed; text is empty and
    /// confidence is zero in that case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_error: Option<String>,
}

impl FinalTranscript {
    pub fn new(text: impl Into<String>, confidence: f32, duration_ms: u64) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            duration_ms,
            cached: false,
            engine_error: None,
        }
    }

    /// Sentinel result for an engine failure. The session survives.
    pub fn engine_failure(duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            duration_ms,
            cached: false,
            engine_error: Some(error.into()),
        }
    }

    /// Mark this transcript as a cache hit.
    pub fn into_cached(mut self) -> Self {
        self.cached = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        let t = FinalTranscript::new("здравей", 1.7, 500);
        assert_eq!(t.confidence, 1.0);
        let t = FinalTranscript::new("здравей", -0.1, 500);
        assert_eq!(t.confidence, 0.0);
    }

    #[test]
    fn test_partial_confidence_serializes_null() {
        let p = PartialTranscript::new("здра");
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"confidence\":null"));
    }

    #[test]
    fn test_engine_failure_sentinel() {
        let t = FinalTranscript::engine_failure(1200, "decoder panic");
        assert!(t.text.is_empty());
        assert_eq!(t.confidence, 0.0);
        assert_eq!(t.engine_error.as_deref(), Some("decoder panic"));
    }
}
