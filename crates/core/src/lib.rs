//! Core types for the Bulgarian voice coach
//!
//! This crate provides the foundational types shared across all other
//! crates:
//! - Audio frame constants and PCM conversion
//! - Transcript types (partial and final)
//! - Learner L1 language codes
//! - Coach data model (corrections, coach responses)
//! - Error types
//! - Fingerprint cache (bounded LRU memoization)

pub mod audio;
pub mod coach;
pub mod error;
pub mod fingerprint;
pub mod l1;
pub mod transcript;

pub use audio::{pcm16_to_f32, AudioFrame, UtteranceBuffer, FRAME_BYTES, FRAME_MS, FRAME_SAMPLES, SAMPLE_RATE};
pub use coach::{CoachResponse, Correction};
pub use error::{Error, Result};
pub use fingerprint::{fingerprint, Fingerprint, FingerprintCache};
pub use l1::L1;
pub use transcript::{FinalTranscript, PartialTranscript};
