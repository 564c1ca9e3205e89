//! Error types shared across the pipeline

use thiserror::Error;

/// Result alias for core errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error kinds.
///
/// Every crate maps its own error enum into one of these kinds at the
/// boundary; the transport layer maps kinds onto HTTP statuses and
/// WebSocket messages.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Malformed input at the transport boundary (bad frame size,
    /// oversize body, invalid JSON). The session stays open.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// The session closed while an operation was in flight. Never
    /// surfaced to the client.
    #[error("cancelled")]
    Cancelled,

    /// An upstream engine (ASR, LLM, TTS) failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// A deadline was exceeded.
    #[error("timeout after {0} ms")]
    Timeout(u64),

    /// Content files failed to load or validate. Fatal at startup only.
    #[error("content load error: {0}")]
    ContentLoad(String),

    /// Unknown grammar item or scenario id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Anything unexpected.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InputValidation("bad frame size: 2 bytes".into());
        assert!(err.to_string().contains("bad frame size"));

        let err = Error::Timeout(30_000);
        assert_eq!(err.to_string(), "timeout after 30000 ms");
    }
}
