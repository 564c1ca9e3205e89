//! VAD gate
//!
//! Converts a live PCM stream into complete utterance buffers. Frame
//! classification sits behind the `SpeechClassifier` seam so the state
//! machine is testable without the WebRTC engine.

use bgcoach_config::VadConfig;
use bgcoach_core::audio::{AudioFrame, UtteranceBuffer, FRAME_MS};

use crate::PipelineError;

/// Events emitted to the orchestrator.
#[derive(Debug, PartialEq)]
pub enum VadEvent {
    /// A speech frame (or trailing-silence frame) was appended to the
    /// utterance buffer.
    FrameAccepted,
    /// Enough trailing silence followed at least one speech frame.
    EndOfUtterance(Vec<i16>),
    /// The utterance hit the duration cap; forced end-of-utterance.
    Timeout(Vec<i16>),
}

/// Per-frame speech/non-speech decision.
pub trait SpeechClassifier: Send {
    fn is_speech(&mut self, frame: &AudioFrame) -> Result<bool, PipelineError>;
}

/// WebRTC VAD classifier.
pub struct WebRtcClassifier {
    vad: webrtc_vad::Vad,
}

impl WebRtcClassifier {
    pub fn new(aggressiveness: u8) -> Result<Self, PipelineError> {
        use webrtc_vad::{SampleRate, Vad, VadMode};

        let mode = match aggressiveness {
            0 => VadMode::Quality,
            1 => VadMode::LowBitrate,
            2 => VadMode::Aggressive,
            3 => VadMode::VeryAggressive,
            other => {
                return Err(PipelineError::Vad(format!(
                    "aggressiveness out of range: {other}"
                )))
            }
        };

        Ok(Self {
            vad: Vad::new_with_rate_and_mode(SampleRate::Rate16kHz, mode),
        })
    }
}

// The fvad handle is exclusively owned by this classifier; it is only
// ever used from the session task that owns the gate.
unsafe impl Send for WebRtcClassifier {}

impl SpeechClassifier for WebRtcClassifier {
    fn is_speech(&mut self, frame: &AudioFrame) -> Result<bool, PipelineError> {
        self.vad
            .is_voice_segment(frame.samples())
            .map_err(|_| PipelineError::Vad("webrtc-vad rejected frame".into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Idle,
    InSpeech,
}

/// The gate: frames in, utterance buffers out.
pub struct VadGate {
    classifier: Box<dyn SpeechClassifier>,
    config: VadConfig,
    state: GateState,
    buffer: UtteranceBuffer,
    /// Consecutive-speech frames in the current utterance.
    speech_frames: usize,
    /// Consecutive-silence frames since the last speech frame.
    silence_frames: usize,
    tail_frames: usize,
    max_frames: usize,
}

impl VadGate {
    pub fn new(config: VadConfig, classifier: Box<dyn SpeechClassifier>) -> Self {
        let tail_frames = (config.tail_ms as usize).div_ceil(FRAME_MS as usize);
        let max_frames = (config.max_utterance_ms as usize) / FRAME_MS as usize;
        Self {
            classifier,
            config,
            state: GateState::Idle,
            buffer: UtteranceBuffer::new(max_frames),
            speech_frames: 0,
            silence_frames: 0,
            tail_frames: tail_frames.max(1),
            max_frames,
        }
    }

    /// Build a gate with the WebRTC classifier.
    pub fn with_webrtc(config: VadConfig) -> Result<Self, PipelineError> {
        let classifier = WebRtcClassifier::new(config.aggressiveness)?;
        Ok(Self::new(config, Box::new(classifier)))
    }

    /// Feed one raw 640-byte frame. A frame of any other size is a
    /// `BadFrame` error and the caller must close the stream.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<Option<VadEvent>, PipelineError> {
        let frame =
            AudioFrame::from_pcm16(bytes).map_err(|e| PipelineError::BadFrame(e.to_string()))?;
        self.push(&frame)
    }

    /// Feed one validated frame.
    pub fn push(&mut self, frame: &AudioFrame) -> Result<Option<VadEvent>, PipelineError> {
        let is_speech = self.classifier.is_speech(frame)?;

        match (self.state, is_speech) {
            (GateState::Idle, false) => Ok(None),

            (GateState::Idle, true) => {
                self.state = GateState::InSpeech;
                self.speech_frames = 1;
                self.silence_frames = 0;
                self.append(frame)
            }

            (GateState::InSpeech, true) => {
                self.speech_frames += 1;
                self.silence_frames = 0;
                self.append(frame)
            }

            (GateState::InSpeech, false) => {
                self.silence_frames += 1;
                if !self.buffer.push(frame) {
                    return Ok(self.finish(true));
                }
                if self.silence_frames >= self.tail_frames {
                    Ok(self.finish(false))
                } else {
                    Ok(Some(VadEvent::FrameAccepted))
                }
            }
        }
    }

    /// Buffered utterance duration in milliseconds.
    pub fn buffered_ms(&self) -> u64 {
        self.buffer.duration_ms()
    }

    /// True while an utterance is open.
    pub fn in_speech(&self) -> bool {
        self.state == GateState::InSpeech
    }

    /// Snapshot of the open utterance for a partial ASR pass.
    pub fn snapshot(&self) -> Vec<i16> {
        self.buffer.samples().to_vec()
    }

    fn append(&mut self, frame: &AudioFrame) -> Result<Option<VadEvent>, PipelineError> {
        let has_room = self.buffer.push(frame);
        if !has_room {
            return Ok(self.finish(true));
        }
        Ok(Some(VadEvent::FrameAccepted))
    }

    /// Close the utterance, applying the minimum-speech filter.
    fn finish(&mut self, timed_out: bool) -> Option<VadEvent> {
        self.state = GateState::Idle;
        let speech_ms = self.speech_frames as u64 * FRAME_MS as u64;
        self.speech_frames = 0;
        self.silence_frames = 0;

        // Utterances at or under the minimum are discarded silently
        // (10 frames at the default 200 ms threshold do not pass).
        if !timed_out && speech_ms <= self.config.min_speech_ms as u64 {
            tracing::debug!(speech_ms, "discarding short utterance");
            self.buffer.clear();
            return None;
        }

        let samples = self.buffer.take();
        if timed_out {
            Some(VadEvent::Timeout(samples))
        } else {
            Some(VadEvent::EndOfUtterance(samples))
        }
    }
}
