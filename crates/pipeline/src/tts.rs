//! TTS engine
//!
//! Drives an external synthesizer (espeak-ng) as a child process and
//! streams a WAV response: a 44-byte RIFF header followed by PCM chunks
//! as they become available. Child processes are capped by a semaphore
//! and reaped on cancellation.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::{mpsc, Semaphore};

use bgcoach_config::TtsConfig;

use crate::PipelineError;

/// Maximum text length accepted for synthesis.
pub const MAX_TEXT_CHARS: usize = 2000;

/// TTS output sample rate (espeak-ng WAV output).
pub const TTS_SAMPLE_RATE: u32 = 22_050;

/// Streaming WAV chunk sizes are unknown up front; the RIFF fields are
/// filled with this sentinel.
const STREAMING_SIZE: u32 = 0x7fff_ffff;

/// Size of the RIFF header emitted by the synthesizer, skipped when
/// re-framing its output.
const CHILD_HEADER_BYTES: usize = 44;

const READ_CHUNK_BYTES: usize = 4096;

/// A named voice profile mapped onto synthesizer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceProfile {
    pub name: &'static str,
    /// Speaking rate in words per minute.
    pub speed: u32,
    /// Pitch, 0-99.
    pub pitch: u32,
}

/// The profile table. Unknown names fall back to `natural`.
pub const PROFILES: [VoiceProfile; 5] = [
    VoiceProfile {
        name: "standard",
        speed: 170,
        pitch: 50,
    },
    VoiceProfile {
        name: "natural",
        speed: 175,
        pitch: 50,
    },
    VoiceProfile {
        name: "slow",
        speed: 120,
        pitch: 50,
    },
    VoiceProfile {
        name: "expressive",
        speed: 185,
        pitch: 60,
    },
    VoiceProfile {
        name: "clear",
        speed: 160,
        pitch: 55,
    },
];

impl VoiceProfile {
    /// Resolve a profile by name, falling back to `natural`.
    pub fn resolve(name: &str) -> &'static VoiceProfile {
        PROFILES
            .iter()
            .find(|p| p.name == name)
            .unwrap_or_else(|| &PROFILES[1])
    }
}

/// Build a 44-byte RIFF header for 22 050 Hz mono s16le PCM.
///
/// `data_len` of `None` produces a streaming header with sentinel sizes.
pub fn wav_header(data_len: Option<u32>) -> [u8; 44] {
    let sample_rate = TTS_SAMPLE_RATE;
    let channels: u16 = 1;
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * bits_per_sample as u32 / 8;
    let block_align = channels * bits_per_sample / 8;

    let data_size = data_len.unwrap_or(STREAMING_SIZE);
    let riff_size = data_len.map(|n| n + 36).unwrap_or(STREAMING_SIZE);

    let mut header = [0u8; 44];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&riff_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bits_per_sample.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
    header
}

/// One synthesis response: the header plus a PCM chunk stream.
///
/// On failure `error` carries a short token for the
/// `X-Synthesis-Error` response header and the chunk stream is empty,
/// leaving a valid zero-data WAV.
pub struct Synthesis {
    pub header: [u8; 44],
    pub chunks: mpsc::Receiver<Vec<u8>>,
    pub error: Option<String>,
}

impl Synthesis {
    fn failed(token: impl Into<String>) -> Self {
        let (_tx, chunks) = mpsc::channel(1);
        Self {
            header: wav_header(Some(0)),
            chunks,
            error: Some(token.into()),
        }
    }
}

/// Synthesizer engine driving an external binary.
pub struct TtsEngine {
    config: TtsConfig,
    limiter: Arc<Semaphore>,
}

impl TtsEngine {
    pub fn new(config: TtsConfig) -> Self {
        let limiter = Arc::new(Semaphore::new(config.max_concurrency));
        Self { config, limiter }
    }

    /// The configured default profile.
    pub fn default_profile(&self) -> &'static VoiceProfile {
        VoiceProfile::resolve(&self.config.default_profile)
    }

    /// True when the synthesizer binary is reachable.
    pub fn is_available(&self) -> bool {
        let path = std::path::Path::new(&self.config.binary_path);
        if path.components().count() > 1 {
            return path.exists();
        }
        // Bare command name: look it up on PATH.
        std::env::var_os("PATH")
            .map(|paths| {
                std::env::split_paths(&paths).any(|dir| dir.join(&self.config.binary_path).exists())
            })
            .unwrap_or(false)
    }

    /// Synthesize Bulgarian text with the named profile.
    ///
    /// Rejects oversize text; all other failures degrade to an empty
    /// WAV with an error token.
    pub async fn synthesize(
        &self,
        text: &str,
        profile_name: &str,
    ) -> Result<Synthesis, PipelineError> {
        let chars = text.chars().count();
        if chars > MAX_TEXT_CHARS {
            return Err(PipelineError::TextTooLong(chars, MAX_TEXT_CHARS));
        }

        let profile = VoiceProfile::resolve(profile_name);
        let permit = match self.limiter.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return Ok(Synthesis::failed("engine_closed")),
        };

        let mut child = match Command::new(&self.config.binary_path)
            .args([
                "-v",
                "bg",
                "-s",
                &profile.speed.to_string(),
                "-p",
                &profile.pitch.to_string(),
                "--stdin",
                "--stdout",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(binary = %self.config.binary_path, error = %e, "synthesizer spawn failed");
                return Ok(Synthesis::failed("spawn_failed"));
            }
        };

        let mut stdin = match child.stdin.take() {
            Some(stdin) => stdin,
            None => return Ok(Synthesis::failed("no_stdin")),
        };
        let mut stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => return Ok(Synthesis::failed("no_stdout")),
        };

        let text = text.to_string();
        let timeout = self.config.timeout();
        let (tx, chunks) = mpsc::channel::<Vec<u8>>(16);

        tokio::spawn(async move {
            // Permit and child live for the duration of the stream; the
            // child is killed on drop if the client goes away.
            let _permit = permit;

            let stream = async {
                if stdin.write_all(text.as_bytes()).await.is_err() {
                    return;
                }
                drop(stdin);

                let mut skipped = 0usize;
                let mut buf = vec![0u8; READ_CHUNK_BYTES];
                loop {
                    match stdout.read(&mut buf).await {
                        Ok(0) => break,
                        Ok(n) => {
                            // Strip the child's own RIFF header; ours
                            // already went out.
                            let mut chunk = &buf[..n];
                            if skipped < CHILD_HEADER_BYTES {
                                let skip = (CHILD_HEADER_BYTES - skipped).min(n);
                                skipped += skip;
                                chunk = &chunk[skip..];
                            }
                            if chunk.is_empty() {
                                continue;
                            }
                            if tx.send(chunk.to_vec()).await.is_err() {
                                // Client gone; stop reading.
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "synthesizer read error");
                            break;
                        }
                    }
                }
            };

            if tokio::time::timeout(timeout, stream).await.is_err() {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "synthesis timed out");
            }

            match child.kill().await {
                Ok(()) => {}
                Err(e) => tracing::debug!(error = %e, "synthesizer already exited"),
            }
            let _ = child.wait().await;
        });

        Ok(Synthesis {
            header: wav_header(None),
            chunks,
            error: None,
        })
    }
}

/// Profile listing for the HTTP surface.
pub fn profile_listing() -> Vec<(&'static str, u32, u32)> {
    PROFILES.iter().map(|p| (p.name, p.speed, p.pitch)).collect()
}
