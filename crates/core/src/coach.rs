//! Coach data model: corrections, drills, and the coach response
//!
//! These are wire types: the JSON shape here is what the client sees in
//! `coach` messages and in `/content/analyze` responses. Arrays keep
//! insertion order; unknown fields are ignored on read.

use serde::{Deserialize, Serialize};

/// One detected error, anchored to a span of the learner's transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    /// Error category (`agreement`, `article`, `clitic`, `infinitive`,
    /// `future`) used for overlap priority.
    pub category: String,
    /// The offending substring, exactly as it appears in the transcript.
    pub before: String,
    /// The proposed replacement.
    pub after: String,
    /// Brief note in Bulgarian, taken from the grammar item's
    /// micro-explanation.
    pub note: String,
    /// Grammar item id in the `bg.*` namespace.
    pub error_tag: String,
    /// Character offsets of `before` into the transcript, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<(usize, usize)>,
}

/// Exercise kinds attached to grammar items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrillKind {
    /// Rewrite a sentence into the target construction.
    Transform,
    /// Fill a blank marked with `___`.
    Fill,
    /// Reorder bracketed tokens `[x]` into a correct sentence.
    Reorder,
}

/// A short practice exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drill {
    #[serde(rename = "type")]
    pub kind: DrillKind,
    /// Bulgarian prompt, with `___` blanks or `[x]` tokens depending on
    /// the kind.
    pub prompt: String,
    /// Canonical Bulgarian answer. Never empty.
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// CEFR level override; the item's levels apply when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Id of the grammar item this drill was attached from. Present only
    /// on drills that originate from a correction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_tag: Option<String>,
}

impl Drill {
    /// True when the prompt carries the marker its kind requires.
    pub fn has_required_marker(&self) -> bool {
        match self.kind {
            DrillKind::Transform => true,
            DrillKind::Fill | DrillKind::Reorder => {
                self.prompt.contains("___") || self.prompt.contains('[')
            }
        }
    }
}

/// The complete coach reply for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachResponse {
    /// Reply text, always Bulgarian.
    pub reply_bg: String,
    /// Detected corrections, detector order.
    #[serde(default)]
    pub corrections: Vec<Correction>,
    /// Contrastive note for the session's L1, when the first correction's
    /// grammar item carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrastive_note: Option<String>,
    /// At most two drills per correction, deduplicated.
    #[serde(default)]
    pub drills: Vec<Drill>,
}

impl CoachResponse {
    /// Reply with no corrections and no drills.
    pub fn plain(reply_bg: impl Into<String>) -> Self {
        Self {
            reply_bg: reply_bg.into(),
            corrections: Vec::new(),
            contrastive_note: None,
            drills: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drill_marker_requirements() {
        let fill = Drill {
            kind: DrillKind::Fill,
            prompt: "Искам ___ поръчам кафе.".into(),
            answer: "да".into(),
            hint: None,
            level: None,
            error_tag: None,
        };
        assert!(fill.has_required_marker());

        let bad_fill = Drill {
            prompt: "Искам да поръчам кафе.".into(),
            ..fill.clone()
        };
        assert!(!bad_fill.has_required_marker());

        let transform = Drill {
            kind: DrillKind::Transform,
            ..bad_fill
        };
        assert!(transform.has_required_marker());
    }

    #[test]
    fn test_coach_response_round_trip() {
        let resp = CoachResponse {
            reply_bg: "Много добре!".into(),
            corrections: vec![Correction {
                category: "infinitive".into(),
                before: "искам поръчвам".into(),
                after: "искам да поръчам".into(),
                note: "Използвай да + сегашно време.".into(),
                error_tag: "bg.no_infinitive.da_present".into(),
                span: Some((0, 14)),
            }],
            contrastive_note: Some("W polskim używa się bezokolicznika.".into()),
            drills: Vec::new(),
        };

        let json = serde_json::to_string(&resp).unwrap();
        let parsed: CoachResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, resp);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{"reply_bg":"Добре.","corrections":[],"drills":[],"extra":42}"#;
        let parsed: CoachResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.reply_bg, "Добре.");
    }
}
