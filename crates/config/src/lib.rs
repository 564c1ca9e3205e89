//! Configuration management for the Bulgarian voice coach
//!
//! A single immutable `Settings` value is constructed at startup from
//! environment variables and passed by reference to components. There is
//! no file layer: the deployment interface is environment-only.

pub mod settings;

pub use settings::{
    AsrConfig, ContentConfig, LlmConfig, LlmProvider, ServerConfig, Settings, TtsConfig, VadConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("environment error: {0}")]
    Environment(String),
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
