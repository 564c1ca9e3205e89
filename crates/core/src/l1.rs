//! Learner L1 (native language) codes
//!
//! The coach supports four Slavic L1s; contrastive notes in the content
//! pack are keyed by these codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported learner native languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum L1 {
    /// Polish
    #[default]
    #[serde(rename = "PL")]
    Pl,
    /// Russian
    #[serde(rename = "RU")]
    Ru,
    /// Ukrainian
    #[serde(rename = "UK")]
    Uk,
    /// Serbian
    #[serde(rename = "SR")]
    Sr,
}

impl L1 {
    /// All supported L1s, in stable order.
    pub const ALL: [L1; 4] = [L1::Pl, L1::Ru, L1::Uk, L1::Sr];

    /// Two-letter uppercase code used on the wire and in content files.
    pub fn code(&self) -> &'static str {
        match self {
            L1::Pl => "PL",
            L1::Ru => "RU",
            L1::Uk => "UK",
            L1::Sr => "SR",
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            L1::Pl => "Polish",
            L1::Ru => "Russian",
            L1::Uk => "Ukrainian",
            L1::Sr => "Serbian",
        }
    }
}

impl fmt::Display for L1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for L1 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PL" => Ok(L1::Pl),
            "RU" => Ok(L1::Ru),
            "UK" => Ok(L1::Uk),
            "SR" => Ok(L1::Sr),
            other => Err(format!("unsupported L1 code: {other}")),
        }
    }
}
