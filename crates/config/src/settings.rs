//! Main settings module
//!
//! Environment variables are the only configuration source. Every
//! recognized variable has a default; `Settings::from_env()` never reads
//! the environment twice and the resulting value is immutable.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use bgcoach_core::L1;

use crate::ConfigError;

/// Main application settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// ASR engine configuration
    #[serde(default)]
    pub asr: AsrConfig,

    /// VAD gate configuration
    #[serde(default)]
    pub vad: VadConfig,

    /// TTS engine configuration
    #[serde(default)]
    pub tts: TtsConfig,

    /// Chat provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Content store configuration
    #[serde(default)]
    pub content: ContentConfig,

    /// Default learner L1 for new sessions
    #[serde(default)]
    pub default_l1: L1,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// ASR worker pool size (0 = number of physical cores)
    #[serde(default)]
    pub workers: usize,

    /// Log level (trace|debug|info|warn|error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// CORS allowed origins; empty means localhost-only default
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
            log_level: default_log_level(),
            cors_origins: Vec::new(),
        }
    }
}

/// ASR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrConfig {
    /// Whisper model size (tiny|base|small|medium|large)
    #[serde(default = "default_model_size")]
    pub model_size: String,

    /// Directory holding ggml model files
    #[serde(default = "default_model_dir")]
    pub model_dir: String,

    /// Beam width for streaming partials
    #[serde(default = "default_beam_partial")]
    pub beam_partial: usize,

    /// Beam width for finalization
    #[serde(default = "default_beam_final")]
    pub beam_final: usize,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// No-speech probability threshold
    #[serde(default = "default_no_speech_threshold")]
    pub no_speech_threshold: f32,

    /// Optional Bulgarian seed prompt
    #[serde(default)]
    pub initial_prompt: Option<String>,
}

fn default_model_size() -> String {
    "small".to_string()
}
fn default_model_dir() -> String {
    "models".to_string()
}
fn default_beam_partial() -> usize {
    1
}
fn default_beam_final() -> usize {
    3
}
fn default_no_speech_threshold() -> f32 {
    0.6
}

impl AsrConfig {
    /// Path of the ggml model file for the configured size.
    pub fn model_path(&self) -> String {
        format!("{}/ggml-{}.bin", self.model_dir, self.model_size)
    }
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            model_size: default_model_size(),
            model_dir: default_model_dir(),
            beam_partial: default_beam_partial(),
            beam_final: default_beam_final(),
            temperature: 0.0,
            no_speech_threshold: default_no_speech_threshold(),
            initial_prompt: None,
        }
    }
}

/// VAD gate configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VadConfig {
    /// Sensitivity, 0 (least) to 3 (most aggressive)
    #[serde(default = "default_aggressiveness")]
    pub aggressiveness: u8,

    /// Trailing silence that ends an utterance, in milliseconds
    #[serde(default = "default_tail_ms")]
    pub tail_ms: u32,

    /// Safety cap on utterance duration, in milliseconds
    #[serde(default = "default_max_utterance_ms")]
    pub max_utterance_ms: u32,

    /// Utterances shorter than this are discarded silently
    #[serde(default = "default_min_speech_ms")]
    pub min_speech_ms: u32,
}

fn default_aggressiveness() -> u8 {
    2
}
fn default_tail_ms() -> u32 {
    250
}
fn default_max_utterance_ms() -> u32 {
    15_000
}
fn default_min_speech_ms() -> u32 {
    200
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            aggressiveness: default_aggressiveness(),
            tail_ms: default_tail_ms(),
            max_utterance_ms: default_max_utterance_ms(),
            min_speech_ms: default_min_speech_ms(),
        }
    }
}

/// TTS engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Path to the synthesizer binary
    #[serde(default = "default_tts_binary")]
    pub binary_path: String,

    /// Default voice profile name
    #[serde(default = "default_tts_profile")]
    pub default_profile: String,

    /// Hard cap on concurrent synthesizer child processes
    #[serde(default = "default_tts_concurrency")]
    pub max_concurrency: usize,

    /// Per-request deadline in seconds
    #[serde(default = "default_tts_timeout_s")]
    pub timeout_s: u64,
}

fn default_tts_binary() -> String {
    "espeak-ng".to_string()
}
fn default_tts_profile() -> String {
    "natural".to_string()
}
fn default_tts_concurrency() -> usize {
    8
}
fn default_tts_timeout_s() -> u64 {
    10
}

impl TtsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s)
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            binary_path: default_tts_binary(),
            default_profile: default_tts_profile(),
            max_concurrency: default_tts_concurrency(),
            timeout_s: default_tts_timeout_s(),
        }
    }
}

/// Chat provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Deterministic local echo, no network
    #[default]
    Dummy,
    /// OpenAI chat completions
    Openai,
    /// Anthropic messages API
    Claude,
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dummy" => Ok(Self::Dummy),
            "openai" => Ok(Self::Openai),
            "claude" => Ok(Self::Claude),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Chat provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Which provider to use
    #[serde(default)]
    pub provider: LlmProvider,

    /// OpenAI API key
    #[serde(default, skip_serializing)]
    pub openai_api_key: Option<String>,

    /// Anthropic API key
    #[serde(default, skip_serializing)]
    pub anthropic_api_key: Option<String>,

    /// Sampling temperature, 0.0 - 1.0
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    /// Per-call deadline in seconds
    #[serde(default = "default_llm_timeout_s")]
    pub timeout_s: u64,
}

fn default_llm_temperature() -> f32 {
    0.3
}
fn default_llm_max_tokens() -> u32 {
    512
}
fn default_llm_timeout_s() -> u64 {
    20
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Dummy,
            openai_api_key: None,
            anthropic_api_key: None,
            temperature: default_llm_temperature(),
            max_tokens: default_llm_max_tokens(),
            timeout_s: default_llm_timeout_s(),
        }
    }
}

/// Content store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Directory holding grammar_pack.json and scenarios.json
    #[serde(default = "default_content_dir")]
    pub dir: String,
}

fn default_content_dir() -> String {
    "content".to_string()
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            dir: default_content_dir(),
        }
    }
}

impl Settings {
    /// Build settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Settings::default();

        if let Some(host) = env_var("HOST") {
            settings.server.host = host;
        }
        if let Some(port) = env_var("PORT") {
            settings.server.port = parse("PORT", &port)?;
        }
        if let Some(level) = env_var("LOG_LEVEL") {
            settings.server.log_level = level;
        }
        if let Some(origins) = env_var("CORS_ORIGINS") {
            settings.server.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Some(provider) = env_var("LLM_PROVIDER") {
            settings.llm.provider = provider
                .parse()
                .map_err(|e: String| ConfigError::invalid("LLM_PROVIDER", e))?;
        }
        settings.llm.openai_api_key = env_var("OPENAI_API_KEY");
        settings.llm.anthropic_api_key = env_var("ANTHROPIC_API_KEY");
        if let Some(temp) = env_var("LLM_TEMPERATURE") {
            settings.llm.temperature = parse("LLM_TEMPERATURE", &temp)?;
        }
        if let Some(max_tokens) = env_var("LLM_MAX_TOKENS") {
            settings.llm.max_tokens = parse("LLM_MAX_TOKENS", &max_tokens)?;
        }
        if let Some(timeout) = env_var("LLM_TIMEOUT_S") {
            settings.llm.timeout_s = parse("LLM_TIMEOUT_S", &timeout)?;
        }

        if let Some(size) = env_var("ASR_MODEL_SIZE") {
            settings.asr.model_size = size;
        }
        if let Some(beam) = env_var("ASR_BEAM_PARTIAL") {
            settings.asr.beam_partial = parse("ASR_BEAM_PARTIAL", &beam)?;
        }
        if let Some(beam) = env_var("ASR_BEAM_FINAL") {
            settings.asr.beam_final = parse("ASR_BEAM_FINAL", &beam)?;
        }
        if let Some(threshold) = env_var("ASR_NO_SPEECH_THRESHOLD") {
            settings.asr.no_speech_threshold = parse("ASR_NO_SPEECH_THRESHOLD", &threshold)?;
        }

        if let Some(level) = env_var("VAD_AGGRESSIVENESS") {
            settings.vad.aggressiveness = parse("VAD_AGGRESSIVENESS", &level)?;
        }
        if let Some(tail) = env_var("VAD_TAIL_MS") {
            settings.vad.tail_ms = parse("VAD_TAIL_MS", &tail)?;
        }
        if let Some(max) = env_var("VAD_MAX_UTTERANCE_MS") {
            settings.vad.max_utterance_ms = parse("VAD_MAX_UTTERANCE_MS", &max)?;
        }

        if let Some(path) = env_var("TTS_BINARY_PATH") {
            settings.tts.binary_path = path;
        }
        if let Some(profile) = env_var("TTS_DEFAULT_PROFILE") {
            settings.tts.default_profile = profile;
        }

        if let Some(l1) = env_var("DEFAULT_L1_LANGUAGE") {
            settings.default_l1 = l1
                .parse()
                .map_err(|e: String| ConfigError::invalid("DEFAULT_L1_LANGUAGE", e))?;
        }
        if let Some(dir) = env_var("CONTENT_DIR") {
            settings.content.dir = dir;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("PORT", "port cannot be 0"));
        }

        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.server.log_level.as_str()) {
            return Err(ConfigError::invalid(
                "LOG_LEVEL",
                format!("must be one of {LEVELS:?}, got '{}'", self.server.log_level),
            ));
        }

        const MODEL_SIZES: [&str; 5] = ["tiny", "base", "small", "medium", "large"];
        if !MODEL_SIZES.contains(&self.asr.model_size.as_str()) {
            return Err(ConfigError::invalid(
                "ASR_MODEL_SIZE",
                format!("must be one of {MODEL_SIZES:?}, got '{}'", self.asr.model_size),
            ));
        }

        if self.asr.beam_partial == 0 || self.asr.beam_final == 0 {
            return Err(ConfigError::invalid(
                "ASR_BEAM_FINAL",
                "beam widths must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.asr.no_speech_threshold) {
            return Err(ConfigError::invalid(
                "ASR_NO_SPEECH_THRESHOLD",
                format!("must be in [0.0, 1.0], got {}", self.asr.no_speech_threshold),
            ));
        }

        if self.vad.aggressiveness > 3 {
            return Err(ConfigError::invalid(
                "VAD_AGGRESSIVENESS",
                format!("must be 0-3, got {}", self.vad.aggressiveness),
            ));
        }
        if self.vad.tail_ms == 0 {
            return Err(ConfigError::invalid("VAD_TAIL_MS", "must be positive"));
        }
        if self.vad.max_utterance_ms < 1000 {
            return Err(ConfigError::invalid(
                "VAD_MAX_UTTERANCE_MS",
                format!("must be at least 1000, got {}", self.vad.max_utterance_ms),
            ));
        }

        if !(0.0..=1.0).contains(&self.llm.temperature) {
            return Err(ConfigError::invalid(
                "LLM_TEMPERATURE",
                format!("must be in [0.0, 1.0], got {}", self.llm.temperature),
            ));
        }
        if self.llm.timeout_s == 0 {
            return Err(ConfigError::invalid("LLM_TIMEOUT_S", "must be positive"));
        }

        if self.tts.max_concurrency == 0 {
            return Err(ConfigError::invalid(
                "TTS_MAX_CONCURRENCY",
                "must be at least 1",
            ));
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse<T: FromStr>(field: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| ConfigError::invalid(field, format!("cannot parse '{value}': {e}")))
}
