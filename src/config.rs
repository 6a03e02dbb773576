//! Configuration loading and types for hotscribe
//!
//! Configuration is layered:
//! 1. Built-in defaults
//! 2. Static config file (~/.config/hotscribe/config.toml), read at startup
//! 3. Runtime store (~/.config/hotscribe/runtime_config.json), re-read before
//!    every transcription/paste operation so edits apply without a restart
//! 4. CLI arguments (highest priority)

use crate::error::HotscribeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Hotscribe Configuration
#
# Location: ~/.config/hotscribe/config.toml
# All settings can be overridden via CLI flags.
#
# Language, model, and the paste timestamp prefix can also be changed while
# the daemon is running: edit runtime_config.json next to this file (or use
# `hotscribe settings`), and the change applies on the next recording.

[hotkey]
# Key to hold for push-to-talk
# Common choices: SCROLLLOCK, PAUSE, RIGHTALT, F13-F24
# Use `evtest` to find key names for your keyboard
key = "SCROLLLOCK"

# Optional modifier keys that must also be held
# Example: modifiers = ["LEFTCTRL", "LEFTALT"]
modifiers = []

[audio]
# Audio input device ("default" uses system default)
device = "default"

# Sample rate in Hz
sample_rate = 16000

# Channel count (1 = mono, 2 = stereo)
channels = 1

# Bits per sample (8, 16, 24, or 32)
bit_depth = 16

# Input buffer size in frames
buffer_size = 1024

# Maximum recording duration in seconds (safety limit)
max_duration_secs = 120

[recording]
# Also write each saved recording to disk (recordings stay in memory either way)
save_to_file = false

# Base name for saved recording files: <base>_<YYYYmmdd_HHMMSS>.wav
base_filename = "recording"

# Recordings shorter than this are rejected as too short
min_duration_secs = 2.0

# Directory for saved recordings (default: data dir under ~/.local/share)
# output_directory = "/home/me/recordings"

[transcription]
# OpenAI-compatible transcription endpoint
endpoint = "https://api.openai.com/v1/audio/transcriptions"

# Model name sent to the API
model = "whisper-1"

# Language hint (ISO code); empty string lets the API auto-detect
language = ""

# Free-text prompt hint for the API
prompt = ""

# Decoding temperature (0.0 to 1.0)
temperature = 0.0

# Response body shape: "text" (plain body) or "json" ({"text": ...})
response_format = "text"

# Per-attempt request timeout in seconds
timeout_secs = 30

# Total attempt bound: N means at most N attempts, 0 means a single attempt
max_retries = 3

[output]
# Primary output mode: "type" or "clipboard"
mode = "type"

# Fall back to clipboard if typing fails
fallback_to_clipboard = true

# Delay between typed characters in milliseconds
type_delay_ms = 0

# Prefix pasted text with a timestamp (runtime store can override)
add_timestamp = false
"#;

/// Name of the hot-reloadable store file, editable while the daemon runs
pub const RUNTIME_STORE_FILE: &str = "runtime_config.json";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub hotkey: HotkeySettings,
    pub audio: AudioSettings,
    pub recording: RecordingSettings,
    pub transcription: TranscriptionSettings,
    pub output: OutputSettings,
}

/// Hotkey detection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HotkeySettings {
    /// Key name (evdev KEY_* constant name, without the KEY_ prefix)
    pub key: String,

    /// Optional modifier keys that must also be held
    pub modifiers: Vec<String>,
}

impl Default for HotkeySettings {
    fn default() -> Self {
        Self {
            key: "SCROLLLOCK".to_string(),
            modifiers: vec![],
        }
    }
}

/// Audio capture parameters, fixed for the lifetime of a recording session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Input device name, or "default"
    pub device: String,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel count (1 or 2)
    pub channels: u16,

    /// Bits per sample (8, 16, 24, or 32)
    pub bit_depth: u16,

    /// Input buffer size in frames
    pub buffer_size: u32,

    /// Maximum recording duration in seconds (safety limit)
    pub max_duration_secs: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            device: "default".to_string(),
            sample_rate: 16_000,
            channels: 1,
            bit_depth: 16,
            buffer_size: 1024,
            max_duration_secs: 120,
        }
    }
}

/// What happens to a recording when it is saved
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecordingSettings {
    /// Persist saved recordings to disk in addition to the in-memory buffer
    pub save_to_file: bool,

    /// Base name for saved recording files
    pub base_filename: String,

    /// Recordings shorter than this many seconds are rejected
    pub min_duration_secs: f64,

    /// Directory for saved recordings; defaults to the data directory
    pub output_directory: Option<PathBuf>,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            save_to_file: false,
            base_filename: "recording".to_string(),
            min_duration_secs: 2.0,
            output_directory: None,
        }
    }
}

impl RecordingSettings {
    /// Directory where recordings land when save_to_file is enabled
    pub fn resolve_output_dir(&self) -> PathBuf {
        self.output_directory
            .clone()
            .unwrap_or_else(|| Config::data_dir().join("recordings"))
    }
}

/// Shape of the transcription endpoint's reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Plain text body
    #[default]
    Text,
    /// JSON body with a "text" field
    Json,
}

/// Remote transcription parameters
///
/// `language` and `model` can be overridden per call through the runtime
/// store; the rest is static for the process lifetime.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// OpenAI-compatible transcription endpoint URL
    pub endpoint: String,

    /// Model name sent to the API
    pub model: String,

    /// Language hint (ISO code), empty for auto-detect
    pub language: String,

    /// Free-text prompt hint, empty for none
    pub prompt: String,

    /// Decoding temperature (0.0 to 1.0)
    pub temperature: f32,

    /// Response body shape
    pub response_format: ResponseFormat,

    /// Per-attempt request timeout in seconds
    pub timeout_secs: u64,

    /// Total attempt bound: N means at most N attempts, 0 means one attempt
    pub max_retries: u32,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            model: "whisper-1".to_string(),
            language: String::new(),
            prompt: String::new(),
            temperature: 0.0,
            response_format: ResponseFormat::Text,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// Text output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Primary output mode
    pub mode: OutputMode,

    /// Fall back to clipboard if typing fails
    pub fallback_to_clipboard: bool,

    /// Delay between typed characters (ms), 0 for fastest
    pub type_delay_ms: u32,

    /// Prefix pasted text with a timestamp (runtime store can override)
    pub add_timestamp: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            mode: OutputMode::Type,
            fallback_to_clipboard: true,
            type_delay_ms: 0,
            add_timestamp: false,
        }
    }
}

/// Output mode selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Simulate keyboard input (wtype/ydotool)
    #[default]
    Type,
    /// Copy to clipboard (wl-copy)
    Clipboard,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "hotscribe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "hotscribe")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the data directory path (saved recordings, diagnostics)
    pub fn data_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "hotscribe")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Path of the hot-reloadable runtime store
    pub fn runtime_store_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(RUNTIME_STORE_FILE)
    }

    /// Directory where debug copies of transmitted audio are written
    pub fn debug_audio_dir() -> PathBuf {
        Self::data_dir().join("debug")
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, HotscribeError> {
    let mut config = Config::default();

    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| HotscribeError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| HotscribeError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    Ok(config)
}

/// The effective per-operation view of the hot-reloadable settings
///
/// Produced by [`RuntimeSettings::resolve`] immediately before each
/// transcription/paste operation; never cached across operations.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    /// Transcription parameters with any store overrides applied
    pub transcription: TranscriptionSettings,
    /// Prefix pasted text with a timestamp
    pub add_timestamp: bool,
}

impl RuntimeSettings {
    /// Resolve the runtime store against the static configuration.
    ///
    /// Never fails: a missing store, an unreadable store, or a store with
    /// missing or wrongly-typed keys falls back to the static configuration
    /// value for exactly the affected keys.
    pub fn resolve(config: &Config, store_path: &Path) -> Self {
        let mut settings = Self {
            transcription: config.transcription.clone(),
            add_timestamp: config.output.add_timestamp,
        };

        let store = match std::fs::read_to_string(store_path) {
            Ok(raw) => match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(
                        "Runtime store {:?} is not valid JSON, using configured defaults: {}",
                        store_path,
                        e
                    );
                    return settings;
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Runtime store {:?} not found, using configured defaults", store_path);
                return settings;
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read runtime store {:?}, using configured defaults: {}",
                    store_path,
                    e
                );
                return settings;
            }
        };

        if let Some(language) = store_str(&store, "transcription", "language") {
            settings.transcription.language = language;
        }
        if let Some(model) = store_str(&store, "transcription", "model") {
            settings.transcription.model = model;
        }
        if let Some(add_timestamp) = store_bool(&store, "paste", "add_timestamp") {
            settings.add_timestamp = add_timestamp;
        }

        tracing::debug!(
            "Resolved runtime settings: language={:?}, model={}, add_timestamp={}",
            settings.transcription.language,
            settings.transcription.model,
            settings.add_timestamp
        );

        settings
    }
}

// Per-key lookups so one malformed key never poisons the rest of the store.

fn store_str(store: &serde_json::Value, group: &str, key: &str) -> Option<String> {
    store
        .get(group)?
        .get(key)?
        .as_str()
        .map(str::to_owned)
}

fn store_bool(store: &serde_json::Value, group: &str, key: &str) -> Option<bool> {
    store.get(group)?.get(key)?.as_bool()
}

/// Set one key in the runtime store, creating the file if needed.
///
/// Used by the `settings` subcommand; the daemon only ever reads the store.
pub fn write_runtime_key(
    store_path: &Path,
    group: &str,
    key: &str,
    value: serde_json::Value,
) -> Result<(), HotscribeError> {
    let mut store = match std::fs::read_to_string(store_path) {
        Ok(raw) => serde_json::from_str::<serde_json::Value>(&raw)
            .unwrap_or_else(|_| serde_json::json!({})),
        Err(_) => serde_json::json!({}),
    };

    if !store.is_object() {
        store = serde_json::json!({});
    }

    let object = store
        .as_object_mut()
        .ok_or_else(|| HotscribeError::Config("runtime store is not a JSON object".into()))?;
    let entry = object
        .entry(group.to_string())
        .or_insert_with(|| serde_json::json!({}));
    if !entry.is_object() {
        *entry = serde_json::json!({});
    }
    if let Some(group_object) = entry.as_object_mut() {
        group_object.insert(key.to_string(), value);
    }

    if let Some(parent) = store_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| HotscribeError::Config(format!("Failed to create config dir: {}", e)))?;
    }

    let contents = serde_json::to_string_pretty(&store)
        .map_err(|e| HotscribeError::Config(format!("Failed to serialize runtime store: {}", e)))?;
    std::fs::write(store_path, contents)
        .map_err(|e| HotscribeError::Config(format!("Failed to write runtime store: {}", e)))?;

    tracing::info!("Runtime store updated: {}.{}", group, key);
    Ok(())
}
