//! ASR engine
//!
//! Whisper-backed transcription with two modes: cheap greedy partials
//! while speech is ongoing, and an authoritative beam-search final once
//! the utterance closes. Finalization is memoized on a digest of the raw
//! PCM and runs on the blocking pool behind a worker semaphore.

use std::sync::Arc;

use tokio::sync::Semaphore;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use bgcoach_config::AsrConfig;
use bgcoach_core::audio::pcm16_to_f32;
use bgcoach_core::fingerprint::{fingerprint, FingerprintCache};
use bgcoach_core::transcript::{FinalTranscript, PartialTranscript};

use crate::PipelineError;

/// Transcription cache capacity.
const CACHE_CAPACITY: usize = 100;

/// Samples per millisecond at 16 kHz.
const SAMPLES_PER_MS: usize = 16;

/// Warm-up audio length: 500 ms of silence.
const WARMUP_SAMPLES: usize = 500 * SAMPLES_PER_MS;

/// Silence-hallucination retry thresholds.
const RETRY_NO_SPEECH_ABOVE: f32 = 0.8;
const RETRY_NO_SPEECH_THRESHOLD: f32 = 0.3;
const RETRY_TEMPERATURE: f32 = 0.2;

/// Whisper-backed ASR engine.
///
/// Construction never fails: when the model cannot be loaded the engine
/// stays unavailable, finalization reports `engine_error`, and the
/// health endpoint surfaces the failure.
pub struct AsrEngine {
    ctx: Option<Arc<WhisperContext>>,
    config: AsrConfig,
    cache: FingerprintCache<FinalTranscript>,
    workers: Arc<Semaphore>,
}

impl AsrEngine {
    /// Load the model and run one warm-up pass on silence, eliminating
    /// the first-use latency spike.
    pub fn new(config: AsrConfig, workers: usize) -> Self {
        let path = config.model_path();
        let ctx = match WhisperContext::new_with_params(&path, WhisperContextParameters::default())
        {
            Ok(ctx) => {
                tracing::info!(model = %path, "ASR model loaded");
                Some(Arc::new(ctx))
            }
            Err(e) => {
                tracing::warn!(model = %path, error = %e, "ASR model unavailable");
                None
            }
        };

        let engine = Self {
            ctx,
            config,
            cache: FingerprintCache::new("asr", CACHE_CAPACITY),
            workers: Arc::new(Semaphore::new(workers.max(1))),
        };

        if let Some(ctx) = engine.ctx.clone() {
            let silence = vec![0.0f32; WARMUP_SAMPLES];
            let outcome = run_pass(
                &ctx,
                &silence,
                &engine.config,
                engine.config.no_speech_threshold,
                engine.config.temperature,
                true,
            );
            match outcome {
                Ok(_) => tracing::debug!("ASR warm-up complete"),
                Err(e) => tracing::warn!(error = %e, "ASR warm-up failed"),
            }
        }

        engine
    }

    /// True when the model loaded and the engine can transcribe.
    pub fn is_available(&self) -> bool {
        self.ctx.is_some()
    }

    /// Model size label, for health reporting.
    pub fn model_size(&self) -> &str {
        &self.config.model_size
    }

    /// Best-effort transcript of a growing utterance buffer.
    ///
    /// Greedy decode, disposable output, no caching.
    pub async fn partial(&self, samples: Vec<i16>) -> Result<PartialTranscript, PipelineError> {
        let ctx = self
            .ctx
            .clone()
            .ok_or_else(|| PipelineError::Asr("model unavailable".into()))?;
        let config = self.config.clone();

        let permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::ChannelClosed)?;

        let text = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let audio = pcm16_to_f32(&samples);
            run_pass(
                &ctx,
                &audio,
                &config,
                config.no_speech_threshold,
                config.temperature,
                true,
            )
            .map(|pass| pass.text)
        })
        .await
        .map_err(|e| PipelineError::Asr(format!("partial task failed: {e}")))??;

        Ok(PartialTranscript::new(text))
    }

    /// Authoritative transcript for one complete utterance.
    ///
    /// Never errors: engine failures are reported in-band through the
    /// `engine_error` sentinel so the session survives.
    pub async fn finalize(&self, samples: Vec<i16>) -> FinalTranscript {
        let duration_ms = (samples.len() / SAMPLES_PER_MS) as u64;

        let ctx = match self.ctx.clone() {
            Some(ctx) => ctx,
            None => return FinalTranscript::engine_failure(duration_ms, "model unavailable"),
        };

        let key = {
            let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
            fingerprint(&[&bytes])
        };
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(duration_ms, "ASR cache hit");
            return hit.into_cached();
        }

        let config = self.config.clone();
        let permit = match self.workers.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return FinalTranscript::engine_failure(duration_ms, "worker pool closed"),
        };

        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let audio = pcm16_to_f32(&samples);

            let first = run_pass(
                &ctx,
                &audio,
                &config,
                config.no_speech_threshold,
                config.temperature,
                false,
            )?;

            // One retry against silence hallucination, nothing further.
            if first.text.is_empty() && first.no_speech_prob > RETRY_NO_SPEECH_ABOVE {
                tracing::debug!(
                    no_speech_prob = first.no_speech_prob,
                    "empty final, retrying with relaxed no-speech threshold"
                );
                return run_pass(
                    &ctx,
                    &audio,
                    &config,
                    RETRY_NO_SPEECH_THRESHOLD,
                    RETRY_TEMPERATURE,
                    false,
                );
            }
            Ok(first)
        })
        .await;

        let transcript = match result {
            Ok(Ok(pass)) => FinalTranscript::new(pass.text, pass.confidence, duration_ms),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "ASR finalization failed");
                FinalTranscript::engine_failure(duration_ms, e.to_string())
            }
            Err(e) => {
                tracing::error!(error = %e, "ASR finalization task panicked");
                FinalTranscript::engine_failure(duration_ms, "finalization task failed")
            }
        };

        if transcript.engine_error.is_none() {
            self.cache.put(key, transcript.clone());
        }
        transcript
    }

    /// Cached transcript count, for health reporting.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

struct PassResult {
    text: String,
    confidence: f32,
    no_speech_prob: f32,
}

/// Run one whisper pass over the audio.
fn run_pass(
    ctx: &WhisperContext,
    audio: &[f32],
    config: &AsrConfig,
    no_speech_threshold: f32,
    temperature: f32,
    greedy: bool,
) -> Result<PassResult, PipelineError> {
    let strategy = if greedy {
        SamplingStrategy::Greedy {
            best_of: config.beam_partial as i32,
        }
    } else {
        SamplingStrategy::BeamSearch {
            beam_size: config.beam_final as i32,
            patience: 1.0,
        }
    };

    let mut params = FullParams::new(strategy);
    params.set_language(Some("bg"));
    params.set_translate(false);
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);
    params.set_suppress_blank(true);
    params.set_temperature(temperature);
    params.set_no_speech_thold(no_speech_threshold);
    if let Some(prompt) = config.initial_prompt.as_deref() {
        params.set_initial_prompt(prompt);
    }

    let mut state = ctx
        .create_state()
        .map_err(|e| PipelineError::Asr(format!("cannot create decoder state: {e}")))?;

    state
        .full(params, audio)
        .map_err(|e| PipelineError::Asr(format!("decode failed: {e}")))?;

    let segments = state
        .full_n_segments()
        .map_err(|e| PipelineError::Asr(e.to_string()))?;

    let mut text = String::new();
    let mut logprob_sum = 0.0f64;
    let mut token_count = 0u32;

    for segment in 0..segments {
        let segment_text = state
            .full_get_segment_text_lossy(segment)
            .map_err(|e| PipelineError::Asr(e.to_string()))?;
        let trimmed = segment_text.trim();
        if !trimmed.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(trimmed);
        }

        let tokens = state
            .full_n_tokens(segment)
            .map_err(|e| PipelineError::Asr(e.to_string()))?;
        for token in 0..tokens {
            let prob = state
                .full_get_token_prob(segment, token)
                .map_err(|e| PipelineError::Asr(e.to_string()))?;
            logprob_sum += (prob.max(1e-10) as f64).ln();
            token_count += 1;
        }
    }

    // Confidence is exp of the mean token logprob, clamped to [0, 1].
    let confidence = if token_count > 0 {
        (logprob_sum / token_count as f64).exp().clamp(0.0, 1.0) as f32
    } else {
        0.0
    };

    // The no-speech probability is derived from token confidence; an
    // empty decode with no tokens is certain silence.
    let no_speech_prob = if text.is_empty() {
        if token_count == 0 {
            1.0
        } else {
            1.0 - confidence
        }
    } else {
        0.0
    };

    Ok(PassResult {
        text,
        confidence,
        no_speech_prob,
    })
}
