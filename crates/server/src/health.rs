//! Health endpoint
//!
//! Reports per-component checks in the RFC health-check draft shape:
//! each check carries `componentType`, `observedValue`, and `status`.
//! Any failing check turns the overall status to `fail` and the
//! response to 503.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Serialize)]
pub struct Check {
    #[serde(rename = "componentType")]
    pub component_type: &'static str,
    #[serde(rename = "observedValue")]
    pub observed_value: serde_json::Value,
    pub status: CheckStatus,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: CheckStatus,
    pub version: &'static str,
    pub checks: BTreeMap<&'static str, Vec<Check>>,
}

/// Build the report from live component state.
pub fn build_report(state: &AppState) -> HealthReport {
    let mut checks: BTreeMap<&'static str, Vec<Check>> = BTreeMap::new();

    let asr_available = state.asr.is_available();
    checks.insert(
        "asr:availability",
        vec![Check {
            component_type: "component",
            observed_value: serde_json::json!({
                "model": state.asr.model_size(),
                "available": asr_available,
            }),
            status: if asr_available {
                CheckStatus::Pass
            } else {
                CheckStatus::Fail
            },
        }],
    );

    let tts_available = state.tts.is_available();
    checks.insert(
        "tts:availability",
        vec![Check {
            component_type: "component",
            observed_value: serde_json::json!({
                "binary": state.settings.tts.binary_path,
                "available": tts_available,
            }),
            // A missing synthesizer degrades responses but does not
            // block the coaching path.
            status: if tts_available {
                CheckStatus::Pass
            } else {
                CheckStatus::Warn
            },
        }],
    );

    checks.insert(
        "content:items",
        vec![Check {
            component_type: "datastore",
            observed_value: serde_json::json!({
                "items": state.content.item_count(),
                "scenarios": state.content.scenario_count(),
                "version": state.content.version(),
            }),
            status: if state.content.item_count() > 0 {
                CheckStatus::Pass
            } else {
                CheckStatus::Warn
            },
        }],
    );

    checks.insert(
        "llm:provider",
        vec![Check {
            component_type: "component",
            observed_value: serde_json::json!(state.composer.provider_name()),
            status: CheckStatus::Pass,
        }],
    );

    let overall = if checks
        .values()
        .flatten()
        .any(|c| c.status == CheckStatus::Fail)
    {
        CheckStatus::Fail
    } else if checks
        .values()
        .flatten()
        .any(|c| c.status == CheckStatus::Warn)
    {
        CheckStatus::Warn
    } else {
        CheckStatus::Pass
    };

    HealthReport {
        status: overall,
        version: env!("CARGO_PKG_VERSION"),
        checks,
    }
}

/// `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Response {
    let report = build_report(&state);
    let status = match report.status {
        CheckStatus::Fail => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (status, Json(report)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;

    #[test]
    fn test_report_fails_when_asr_unavailable() {
        // The test state points ASR at a missing model.
        let report = build_report(&test_state());
        assert_eq!(report.status, CheckStatus::Fail);

        let asr = &report.checks["asr:availability"][0];
        assert_eq!(asr.status, CheckStatus::Fail);
        assert_eq!(asr.component_type, "component");
    }

    #[test]
    fn test_report_shape() {
        let report = build_report(&test_state());
        let json = serde_json::to_value(&report).unwrap();

        let check = &json["checks"]["asr:availability"][0];
        assert!(check.get("componentType").is_some());
        assert!(check.get("observedValue").is_some());
        assert!(check.get("status").is_some());

        let content = &json["checks"]["content:items"][0];
        assert_eq!(content["observedValue"]["items"], 1);
        assert_eq!(content["status"], "pass");
    }
}
