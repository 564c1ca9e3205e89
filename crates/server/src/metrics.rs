//! Prometheus metrics
//!
//! A process-wide recorder with small helpers for the hot paths, plus
//! the `/metrics` render handler.

use std::time::Duration;

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Safe to call once at startup;
/// subsequent calls return the existing handle.
pub fn init_metrics() -> Option<&'static PrometheusHandle> {
    match HANDLE.get_or_try_init(|| PrometheusBuilder::new().install_recorder()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder unavailable");
            None
        }
    }
}

/// `GET /metrics`
pub async fn metrics_handler() -> String {
    HANDLE.get().map(|h| h.render()).unwrap_or_default()
}

pub fn record_session_open() {
    counter!("sessions_opened_total").increment(1);
    gauge!("sessions_active").increment(1.0);
}

pub fn record_session_close() {
    gauge!("sessions_active").decrement(1.0);
}

pub fn record_asr_partial_latency(elapsed: Duration) {
    histogram!("asr_partial_latency_seconds").record(elapsed.as_secs_f64());
}

pub fn record_asr_final_latency(elapsed: Duration) {
    histogram!("asr_final_latency_seconds").record(elapsed.as_secs_f64());
}

pub fn record_coach_latency(elapsed: Duration) {
    histogram!("coach_latency_seconds").record(elapsed.as_secs_f64());
}

pub fn record_utterance_latency(elapsed: Duration) {
    histogram!("utterance_latency_seconds").record(elapsed.as_secs_f64());
}

pub fn record_cache_hit(cache: &'static str) {
    counter!("cache_hits_total", "cache" => cache).increment(1);
}

pub fn record_tts_failure() {
    counter!("tts_failures_total").increment(1);
}
