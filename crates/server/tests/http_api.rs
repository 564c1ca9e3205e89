//! HTTP surface integration tests
//!
//! Drives the real router through tower's `oneshot` with an in-memory
//! content pack. ASR points at a missing model and TTS at a missing
//! binary so the degraded paths are exercised deterministically.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use common::app;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn scenarios_listing_carries_primary_ids() {
    let response = app().oneshot(get("/content/scenarios")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json[0]["id"], "cafe_order");
    assert_eq!(json[0]["level"], "A1");
    assert_eq!(json[0]["primary"][0], "bg.no_infinitive.da_present");
    // Summaries do not leak full scenario bodies.
    assert!(json[0].get("turns").is_none());
}

#[tokio::test]
async fn grammar_item_selects_contrast_note() {
    let response = app()
        .oneshot(get("/content/grammar/bg.no_infinitive.da_present?l1=PL"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["contrast_note"], "Po polsku bezokolicznik.");
    assert!(json["contrast"].get("RU").is_none());
}

#[tokio::test]
async fn grammar_item_without_l1_returns_all_notes() {
    let response = app()
        .oneshot(get("/content/grammar/bg.no_infinitive.da_present"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["contrast"].get("PL").is_some());
    assert!(json["contrast"].get("RU").is_some());
    assert!(json.get("contrast_note").is_none());
}

#[tokio::test]
async fn unknown_grammar_id_is_404() {
    let response = app().oneshot(get("/content/grammar/bg.missing.item")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["id"], "bg.missing.item");
}

#[tokio::test]
async fn drills_endpoint_returns_declared_order() {
    let response = app()
        .oneshot(get("/content/drills/bg.no_infinitive.da_present"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let drills = json["drills"].as_array().unwrap();
    assert_eq!(drills.len(), 3);
    assert_eq!(drills[0]["answer"], "да поръчам");
    assert_eq!(drills[0]["type"], "fill");
}

#[tokio::test]
async fn analyze_detects_da_construction() {
    let response = app()
        .oneshot(post_json(
            "/content/analyze",
            r#"{"text":"Искам поръчвам кафе.","l1":"PL"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let corrections = json["corrections"].as_array().unwrap();
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0]["error_tag"], "bg.no_infinitive.da_present");
    assert_eq!(corrections[0]["before"], "Искам поръчвам");
    assert_eq!(corrections[0]["after"], "искам да поръчам");

    let drills = json["drills"].as_array().unwrap();
    assert!(drills.len() <= 2 * corrections.len());
    assert_eq!(drills[0]["error_tag"], "bg.no_infinitive.da_present");
}

#[tokio::test]
async fn analyze_is_deterministic() {
    let app = app();
    let mut bodies = Vec::new();
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_json(
                "/content/analyze",
                r#"{"text":"Утре ходя на кино.","l1":"RU"}"#,
            ))
            .await
            .unwrap();
        bodies.push(body_json(response).await);
    }
    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn analyze_rejects_oversize_body() {
    let padding = "а".repeat(40 * 1024);
    let body = format!(r#"{{"text":"{padding}","l1":"PL"}}"#);
    let response = app().oneshot(post_json("/content/analyze", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn config_round_trip() {
    let app = app();

    let response = app.clone().oneshot(get("/api/config")).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["default_l1"], "PL");
    assert_eq!(json["supported_l1"].as_array().unwrap().len(), 4);

    let response = app
        .clone()
        .oneshot(post_json("/api/config/l1", r#"{"l1_language":"RU"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/api/config")).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["default_l1"], "RU");

    let response = app
        .oneshot(post_json("/api/config/l1", r#"{"l1_language":"DE"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_fails_when_asr_model_missing() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["status"], "fail");
    assert_eq!(json["checks"]["asr:availability"][0]["status"], "fail");
    assert_eq!(
        json["checks"]["asr:availability"][0]["componentType"],
        "component"
    );
    assert_eq!(json["checks"]["content:items"][0]["observedValue"]["items"], 1);
}

#[tokio::test]
async fn tts_failure_still_answers_valid_wav() {
    let response = app()
        .oneshot(get("/tts?text=%D0%97%D0%B4%D1%80%D0%B0%D0%B2%D0%B5%D0%B9&profile=slow"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "audio/wav"
    );
    assert!(response.headers().get("X-Synthesis-Error").is_some());

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    // Header-only WAV: 44 bytes, zero-length data chunk.
    assert_eq!(bytes.len(), 44);
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 0);
}

#[tokio::test]
async fn tts_rejects_oversize_text() {
    let text = "a".repeat(2001);
    let response = app().oneshot(get(&format!("/tts?text={text}"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn tts_profiles_listing() {
    let response = app().oneshot(get("/tts/profiles")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let profiles = json["profiles"].as_array().unwrap();
    assert_eq!(profiles.len(), 5);
    assert!(profiles.iter().any(|p| p["name"] == "slow" && p["speed"] == 120));
    assert_eq!(json["default"], "natural");
}
