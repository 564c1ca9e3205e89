//! HTTP endpoints
//!
//! Content lookup, TTS streaming, runtime configuration, and health.

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::trace::TraceLayer;

use bgcoach_core::coach::{Correction, Drill};
use bgcoach_core::L1;
use bgcoach_pipeline::{profile_listing, PipelineError};

use crate::health::health_handler;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::websocket::ws_handler;
use crate::ServerError;

/// Body limit for `/content/analyze`.
const ANALYZE_BODY_LIMIT: usize = 32 * 1024;

/// Body limit for every other JSON endpoint.
const DEFAULT_BODY_LIMIT: usize = 8 * 1024;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.cors_origins);

    Router::new()
        // Audio session
        .route("/ws/asr", get(ws_handler))
        // TTS
        .route("/tts", get(tts))
        .route("/tts/profiles", get(tts_profiles))
        // Content lookup
        .route("/content/scenarios", get(list_scenarios))
        .route("/content/grammar/:id", get(get_grammar_item))
        .route("/content/drills/:id", get(get_drills))
        .route(
            "/content/analyze",
            post(analyze).layer(DefaultBodyLimit::max(ANALYZE_BODY_LIMIT)),
        )
        // Runtime configuration
        .route("/api/config", get(get_config))
        .route("/api/config/l1", post(set_default_l1))
        // Health and metrics
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        // Middleware
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build the CORS layer from configured origins. No origins configured
/// defaults to localhost for safety.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!(origin = %origin, "invalid CORS origin");
                None
            })
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::any());

    if parsed.is_empty() {
        tracing::info!("no CORS origins configured, defaulting to localhost:3000");
        layer.allow_origin("http://localhost:3000".parse::<HeaderValue>().expect("static origin"))
    } else {
        tracing::info!(origins = parsed.len(), "CORS configured");
        layer.allow_origin(parsed)
    }
}

fn not_found(id: &str) -> Response {
    (
        StatusCode::from(ServerError::NotFound(id.to_string())),
        Json(serde_json::json!({ "error": "not_found", "id": id })),
    )
        .into_response()
}

fn bad_l1(message: String) -> Response {
    (
        StatusCode::from(ServerError::InvalidRequest(message.clone())),
        Json(serde_json::json!({ "error": "bad_l1", "message": message })),
    )
        .into_response()
}

// ── TTS ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TtsQuery {
    text: String,
    #[serde(default)]
    profile: Option<String>,
}

/// Streaming WAV synthesis.
///
/// Synthesizer failures still answer 200 with a valid zero-data WAV and
/// an `X-Synthesis-Error` header so the client UI can progress.
async fn tts(State(state): State<AppState>, Query(query): Query<TtsQuery>) -> Response {
    let profile = query
        .profile
        .unwrap_or_else(|| state.settings.tts.default_profile.clone());

    let synthesis = match state.tts.synthesize(&query.text, &profile).await {
        Ok(synthesis) => synthesis,
        Err(PipelineError::TextTooLong(got, max)) => {
            return (
                StatusCode::from(ServerError::PayloadTooLarge),
                Json(serde_json::json!({
                    "error": "text_too_long",
                    "length": got,
                    "max": max,
                })),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "synthesis failed unexpectedly");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let header_bytes = Bytes::copy_from_slice(&synthesis.header);
    let stream = futures::stream::once(async move { Ok::<_, std::io::Error>(header_bytes) })
        .chain(ReceiverStream::new(synthesis.chunks).map(|chunk| Ok(Bytes::from(chunk))));

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/wav");
    if let Some(error) = &synthesis.error {
        crate::metrics::record_tts_failure();
        response = response.header("X-Synthesis-Error", error.as_str());
    }
    response
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[derive(Debug, Serialize)]
struct ProfileInfo {
    name: &'static str,
    speed: u32,
    pitch: u32,
}

/// Voice profile listing.
async fn tts_profiles(State(state): State<AppState>) -> Json<serde_json::Value> {
    let profiles: Vec<ProfileInfo> = profile_listing()
        .into_iter()
        .map(|(name, speed, pitch)| ProfileInfo { name, speed, pitch })
        .collect();

    Json(serde_json::json!({
        "profiles": profiles,
        "default": state.settings.tts.default_profile,
    }))
}

// ── Content ─────────────────────────────────────────────────────────

/// Scenario summaries.
async fn list_scenarios(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!(state.content.list_scenarios()))
}

#[derive(Debug, Deserialize)]
struct GrammarQuery {
    #[serde(default)]
    l1: Option<String>,
}

/// Single grammar item. With `l1`, the contrast map is narrowed to the
/// requested language and a `contrast_note` convenience field is added;
/// without it, all contrast notes are returned.
async fn get_grammar_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<GrammarQuery>,
) -> Response {
    let Some(item) = state.content.get_item(&id) else {
        return not_found(&id);
    };

    let l1 = match query.l1.as_deref().map(str::parse::<L1>) {
        Some(Ok(l1)) => Some(l1),
        Some(Err(e)) => return bad_l1(e),
        None => None,
    };

    let mut value = match serde_json::to_value(item) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "item serialization failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Some(l1) = l1 {
        let note = state.content.contrast_for(item, l1);
        if let Some(obj) = value.as_object_mut() {
            let mut contrast = serde_json::Map::new();
            if let Some(note) = note {
                contrast.insert(l1.code().to_string(), serde_json::json!(note));
            }
            obj.insert("contrast".into(), serde_json::Value::Object(contrast));
            obj.insert("contrast_note".into(), serde_json::json!(note));
        }
    }

    Json(value).into_response()
}

/// Drills for a grammar item.
async fn get_drills(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(item) = state.content.get_item(&id) else {
        return not_found(&id);
    };
    Json(serde_json::json!({
        "id": item.id,
        "drills": item.drills,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    text: String,
    #[serde(default)]
    l1: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    corrections: Vec<Correction>,
    drills: Vec<Drill>,
}

/// Run the grammar detector over submitted text.
async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    let l1 = match request.l1.as_deref().map(str::parse::<L1>) {
        Some(Ok(l1)) => l1,
        Some(Err(e)) => return bad_l1(e),
        None => state.default_l1(),
    };

    let (corrections, drills) = state.composer.analyze(&request.text, l1);
    Json(AnalyzeResponse {
        corrections,
        drills,
    })
    .into_response()
}

// ── Runtime configuration ───────────────────────────────────────────

/// Current defaults and the supported L1 set.
async fn get_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "default_l1": state.default_l1(),
        "supported_l1": L1::ALL,
    }))
}

#[derive(Debug, Deserialize)]
struct SetL1Request {
    l1_language: String,
}

/// Update the default L1 for new sessions.
async fn set_default_l1(
    State(state): State<AppState>,
    Json(request): Json<SetL1Request>,
) -> Response {
    match request.l1_language.parse::<L1>() {
        Ok(l1) => {
            state.set_default_l1(l1);
            Json(serde_json::json!({ "default_l1": l1 })).into_response()
        }
        Err(e) => bad_l1(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;

    #[test]
    fn test_router_creation() {
        let _ = create_router(test_state());
    }

    #[test]
    fn test_cors_layer_with_invalid_origin_falls_back() {
        let _ = build_cors_layer(&["not a header value\u{0}".to_string()]);
        let _ = build_cors_layer(&[]);
        let _ = build_cors_layer(&["https://coach.example".to_string()]);
    }

    #[test]
    fn test_analyze_request_parsing() {
        let request: AnalyzeRequest =
            serde_json::from_str(r#"{"text":"Искам поръчвам кафе.","l1":"PL"}"#).unwrap();
        assert_eq!(request.l1.as_deref(), Some("PL"));

        let request: AnalyzeRequest = serde_json::from_str(r#"{"text":"здравей"}"#).unwrap();
        assert!(request.l1.is_none());
    }
}
