//! WebSocket audio endpoint and session orchestrator
//!
//! One orchestrator per connection. Binary frames feed the VAD gate;
//! each closed utterance runs finalization and coaching on a background
//! task while the socket loop keeps consuming audio. Message order per
//! utterance is partial* -> final -> coach, and utterance N+1 never
//! starts emitting before utterance N has finished.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use bgcoach_coach::CoachComposer;
use bgcoach_core::audio::FRAME_BYTES;
use bgcoach_core::coach::CoachResponse;
use bgcoach_core::L1;
use bgcoach_pipeline::{AsrEngine, VadEvent, VadGate};

use crate::metrics;
use crate::session::{SessionPhase, SessionState};
use crate::state::AppState;

/// Outgoing queue depth; partials are dropped when it is full,
/// finalization output never is.
const OUT_QUEUE: usize = 32;

/// End-to-end budget per utterance.
const UTTERANCE_BUDGET: Duration = Duration::from_secs(30);

/// Close codes.
const CLOSE_NORMAL: u16 = 1000;
const CLOSE_INTERNAL: u16 = 1011;

/// Server -> client messages.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsOut {
    Partial {
        text: String,
        confidence: Option<f32>,
    },
    Final {
        text: String,
        confidence: f32,
        duration_ms: u64,
    },
    Coach {
        payload: CoachResponse,
    },
    Error {
        code: String,
        message: String,
    },
}

/// Client -> server control messages.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ControlIn {
    Start,
    Stop,
    SetL1 { l1: String },
}

/// WebSocket upgrade handler for `/ws/asr`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (out_tx, out_rx) = mpsc::channel::<Message>(OUT_QUEUE);
    let writer = tokio::spawn(write_loop(ws_tx, out_rx));
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let session = Arc::new(Mutex::new(SessionState::new(state.default_l1())));
    let session_id = session.lock().id.clone();

    let mut gate = match VadGate::with_webrtc(state.settings.vad) {
        Ok(gate) => gate,
        Err(e) => {
            tracing::error!(session_id = %session_id, error = %e, "cannot build VAD gate");
            let _ = out_tx
                .send(close_frame(CLOSE_INTERNAL, "vad unavailable"))
                .await;
            drop(out_tx);
            let _ = writer.await;
            return;
        }
    };

    session.lock().phase = SessionPhase::Listening;
    metrics::record_session_open();
    tracing::info!(session_id = %session_id, l1 = %session.lock().l1, "session started");

    let mut partial_task: Option<JoinHandle<()>> = None;
    let mut utterance_task: Option<JoinHandle<()>> = None;
    let mut pending: VecDeque<(Vec<i16>, Instant)> = VecDeque::new();

    loop {
        tokio::select! {
            // The running utterance finished; start the next queued one.
            _ = async {
                if let Some(task) = utterance_task.as_mut() {
                    let _ = task.await;
                }
            }, if utterance_task.is_some() =>
            {
                utterance_task = None;
                session.lock().phase = SessionPhase::Listening;
                if let Some((samples, started)) = pending.pop_front() {
                    utterance_task = Some(spawn_utterance(
                        samples,
                        started,
                        &state,
                        &session,
                        &out_tx,
                        cancel_rx.clone(),
                    ));
                }
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => {
                        if data.is_empty() || data.len() % FRAME_BYTES != 0 {
                            tracing::warn!(
                                session_id = %session_id,
                                bytes = data.len(),
                                "binary message is not whole frames"
                            );
                            send_error(&out_tx, "bad_frame", "audio must be whole 640-byte frames").await;
                            let _ = out_tx.send(close_frame(CLOSE_NORMAL, "bad frame")).await;
                            break;
                        }

                        let mut stream_broken = false;
                        for chunk in data.chunks_exact(FRAME_BYTES) {
                            match gate.push_bytes(chunk) {
                                Ok(Some(VadEvent::FrameAccepted)) => {
                                    maybe_schedule_partial(
                                        &state,
                                        &gate,
                                        &session,
                                        &out_tx,
                                        &cancel_rx,
                                        &mut partial_task,
                                        utterance_task.is_some(),
                                    );
                                }
                                Ok(Some(VadEvent::EndOfUtterance(samples)))
                                | Ok(Some(VadEvent::Timeout(samples))) => {
                                    if let Some(task) = partial_task.take() {
                                        task.abort();
                                    }
                                    session.lock().reset_partials();
                                    let job = (samples, Instant::now());
                                    if utterance_task.is_none() {
                                        utterance_task = Some(spawn_utterance(
                                            job.0,
                                            job.1,
                                            &state,
                                            &session,
                                            &out_tx,
                                            cancel_rx.clone(),
                                        ));
                                    } else {
                                        pending.push_back(job);
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    tracing::warn!(session_id = %session_id, error = %e, "VAD rejected stream");
                                    send_error(&out_tx, "bad_frame", &e.to_string()).await;
                                    let _ = out_tx.send(close_frame(CLOSE_NORMAL, "bad frame")).await;
                                    stream_broken = true;
                                    break;
                                }
                            }
                        }
                        if stream_broken {
                            break;
                        }
                    }

                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ControlIn>(&text) {
                            Ok(ControlIn::Start) => {
                                session.lock().phase = SessionPhase::Listening;
                            }
                            Ok(ControlIn::Stop) => {
                                tracing::info!(session_id = %session_id, "stop requested");
                                let _ = out_tx.send(close_frame(CLOSE_NORMAL, "stopped")).await;
                                break;
                            }
                            Ok(ControlIn::SetL1 { l1 }) => match l1.parse::<L1>() {
                                Ok(l1) => {
                                    session.lock().l1 = l1;
                                    tracing::debug!(session_id = %session_id, l1 = %l1, "session L1 updated");
                                }
                                Err(e) => send_error(&out_tx, "bad_l1", &e).await,
                            },
                            Err(e) => {
                                // Malformed control messages leave the
                                // session open.
                                send_error(&out_tx, "bad_json", &e.to_string()).await;
                            }
                        }
                    }

                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong handled by axum
                    Some(Err(e)) => {
                        tracing::debug!(session_id = %session_id, error = %e, "socket error");
                        break;
                    }
                }
            }
        }
    }

    // Cancellation: flip the watch, abort background work, stop writing.
    let _ = cancel_tx.send(true);
    if let Some(task) = partial_task {
        task.abort();
    }
    if let Some(task) = utterance_task {
        task.abort();
        tracing::debug!(session_id = %session_id, "utterance task cancelled");
    }
    session.lock().phase = SessionPhase::Closed;
    drop(out_tx);
    let _ = writer.await;
    metrics::record_session_close();
    tracing::info!(
        session_id = %session_id,
        utterances = session.lock().utterances,
        "session closed"
    );
}

/// Forward queued messages to the socket until either side closes.
async fn write_loop(mut ws_tx: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Message>) {
    while let Some(msg) = rx.recv().await {
        let is_close = matches!(msg, Message::Close(_));
        if ws_tx.send(msg).await.is_err() || is_close {
            break;
        }
    }
    let _ = ws_tx.close().await;
}

/// Schedule a partial ASR pass when the debounce window allows and no
/// finalization is in flight.
#[allow(clippy::too_many_arguments)]
fn maybe_schedule_partial(
    state: &AppState,
    gate: &VadGate,
    session: &Arc<Mutex<SessionState>>,
    out_tx: &mpsc::Sender<Message>,
    cancel_rx: &watch::Receiver<bool>,
    partial_task: &mut Option<JoinHandle<()>>,
    finalizing: bool,
) {
    if finalizing || !state.asr.is_available() || !gate.in_speech() {
        return;
    }
    if partial_task.as_ref().is_some_and(|t| !t.is_finished()) {
        return;
    }
    if !session.lock().allow_partial(Instant::now()) {
        return;
    }

    let snapshot = gate.snapshot();
    let asr = state.asr.clone();
    let session = session.clone();
    let out_tx = out_tx.clone();
    let cancel_rx = cancel_rx.clone();

    *partial_task = Some(tokio::spawn(async move {
        let started = Instant::now();
        match asr.partial(snapshot).await {
            Ok(partial) => {
                if *cancel_rx.borrow() {
                    return;
                }
                metrics::record_asr_partial_latency(started.elapsed());
                if session.lock().accept_partial_text(&partial.text) {
                    let msg = WsOut::Partial {
                        text: partial.text,
                        confidence: None,
                    };
                    // Partials are disposable: dropped under backpressure.
                    let _ = out_tx.try_send(encode(&msg));
                }
            }
            Err(e) => tracing::debug!(error = %e, "partial pass failed"),
        }
    }));
}

/// Run one utterance through finalization and coaching.
fn spawn_utterance(
    samples: Vec<i16>,
    started: Instant,
    state: &AppState,
    session: &Arc<Mutex<SessionState>>,
    out_tx: &mpsc::Sender<Message>,
    cancel_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let asr = state.asr.clone();
    let composer = state.composer.clone();
    let session = session.clone();
    let out_tx = out_tx.clone();
    session.lock().phase = SessionPhase::Transcribing;

    tokio::spawn(async move {
        let outcome = tokio::time::timeout(
            UTTERANCE_BUDGET,
            run_utterance(samples, &asr, &composer, &session, &out_tx, &cancel_rx),
        )
        .await;

        match outcome {
            Ok(()) => {
                session.lock().utterances += 1;
                metrics::record_utterance_latency(started.elapsed());
            }
            Err(_) => {
                tracing::warn!(
                    budget_ms = UTTERANCE_BUDGET.as_millis() as u64,
                    "utterance exceeded end-to-end budget"
                );
                send_error(&out_tx, "timeout", "utterance processing timed out").await;
            }
        }
    })
}

async fn run_utterance(
    samples: Vec<i16>,
    asr: &AsrEngine,
    composer: &CoachComposer,
    session: &Arc<Mutex<SessionState>>,
    out_tx: &mpsc::Sender<Message>,
    cancel_rx: &watch::Receiver<bool>,
) {
    let asr_started = Instant::now();
    let transcript = asr.finalize(samples).await;
    if *cancel_rx.borrow() {
        return;
    }
    metrics::record_asr_final_latency(asr_started.elapsed());
    if transcript.cached {
        metrics::record_cache_hit("asr");
    }

    let final_msg = WsOut::Final {
        text: transcript.text.clone(),
        confidence: transcript.confidence,
        duration_ms: transcript.duration_ms,
    };
    // Finalization output is never dropped; block on the queue.
    if out_tx.send(encode(&final_msg)).await.is_err() {
        return;
    }

    let l1 = {
        let mut session = session.lock();
        session.phase = SessionPhase::Coaching;
        session.l1
    };

    let coach_started = Instant::now();
    let response = composer.compose(&transcript.text, l1).await;
    if *cancel_rx.borrow() {
        return;
    }
    metrics::record_coach_latency(coach_started.elapsed());

    let coach_msg = WsOut::Coach { payload: response };
    let _ = out_tx.send(encode(&coach_msg)).await;
}

fn encode(msg: &WsOut) -> Message {
    // WsOut carries only serializable fields; encoding cannot fail.
    Message::Text(serde_json::to_string(msg).unwrap_or_default())
}

async fn send_error(out_tx: &mpsc::Sender<Message>, code: &str, message: &str) {
    let msg = WsOut::Error {
        code: code.to_string(),
        message: message.to_string(),
    };
    let _ = out_tx.send(encode(&msg)).await;
}

fn close_frame(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_message_shapes() {
        let partial = WsOut::Partial {
            text: "здра".into(),
            confidence: None,
        };
        let json = serde_json::to_string(&partial).unwrap();
        assert!(json.contains("\"type\":\"partial\""));
        assert!(json.contains("\"confidence\":null"));

        let fin = WsOut::Final {
            text: "здравей".into(),
            confidence: 0.91,
            duration_ms: 1600,
        };
        let json = serde_json::to_string(&fin).unwrap();
        assert!(json.contains("\"type\":\"final\""));
        assert!(json.contains("\"duration_ms\":1600"));

        let coach = WsOut::Coach {
            payload: CoachResponse::plain("Добре."),
        };
        let json = serde_json::to_string(&coach).unwrap();
        assert!(json.contains("\"type\":\"coach\""));
        assert!(json.contains("\"reply_bg\""));
    }

    #[test]
    fn test_control_message_parsing() {
        assert!(matches!(
            serde_json::from_str::<ControlIn>(r#"{"type":"start"}"#).unwrap(),
            ControlIn::Start
        ));
        assert!(matches!(
            serde_json::from_str::<ControlIn>(r#"{"type":"stop"}"#).unwrap(),
            ControlIn::Stop
        ));
        match serde_json::from_str::<ControlIn>(r#"{"type":"set_l1","l1":"PL"}"#).unwrap() {
            ControlIn::SetL1 { l1 } => assert_eq!(l1, "PL"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(serde_json::from_str::<ControlIn>(r#"{"type":"unknown"}"#).is_err());
    }
}
