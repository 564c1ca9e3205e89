//! Grammar pack and scenario index
//!
//! Loads, validates, and serves the two content documents (grammar pack,
//! scenarios) at process start. A malformed document or an unresolvable
//! reference is fatal: the process refuses to start rather than run in a
//! degraded state. After loading, the store is fully immutable and reads
//! are lock-free.

pub mod model;
pub mod store;

pub use model::{GrammarBinding, GrammarItem, ItemExample, Scenario, ScenarioSummary};
pub use store::ContentStore;

use thiserror::Error;

/// Content loading errors. All fatal at startup.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("content validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

impl From<ContentError> for bgcoach_core::Error {
    fn from(err: ContentError) -> Self {
        bgcoach_core::Error::ContentLoad(err.to_string())
    }
}
