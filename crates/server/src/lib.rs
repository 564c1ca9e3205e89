//! Bulgarian voice coach server
//!
//! Provides the WebSocket audio endpoint, the HTTP content/TTS surface,
//! and the per-session orchestrator that wires the pipeline together.

pub mod health;
pub mod http;
pub mod metrics;
pub mod session;
pub mod state;
pub mod websocket;

pub use http::create_router;
pub use state::AppState;

use thiserror::Error;

/// Server errors surfaced at the HTTP boundary.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        use axum::http::StatusCode;
        match err {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            StatusCode::from(ServerError::NotFound("bg.x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            StatusCode::from(ServerError::PayloadTooLarge),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
