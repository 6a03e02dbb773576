//! Error types for hotscribe
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the hotscribe application
#[derive(Error, Debug)]
pub enum HotscribeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Audio capture error: {0}")]
    Audio(#[from] AudioError),

    #[error("Recording error: {0}")]
    Session(#[from] SessionError),

    #[error("Transcription error: {0}")]
    Transcribe(#[from] TranscribeError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to hotkey detection
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("Unknown key name: '{0}'. Use evtest to find valid key names.")]
    UnknownKey(String),

    #[error("No keyboard device found in /dev/input/")]
    NoKeyboard,

    #[error("Hotkey detection not supported on this platform. {0}")]
    NotSupported(String),
}

/// Errors related to audio capture
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio connection failed: {0}")]
    Connection(String),

    #[error("Audio device not found: '{0}'")]
    DeviceNotFound(String),

    #[error("Audio stream error: {0}")]
    StreamError(String),
}

/// Errors from the recording session state machine
///
/// `InvalidState` is the recoverable "wrong lifecycle state" signal the
/// orchestrator is expected to check. The remaining variants are harder
/// failures that still leave the session in a well-defined state.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("cannot {op} while the session is {state}")]
    InvalidState {
        op: &'static str,
        state: &'static str,
    },

    #[error("audio input unavailable: {0}")]
    DeviceUnavailable(#[from] AudioError),

    #[error("recording too short: {actual:.2}s (minimum {min:.2}s)")]
    TooShort { actual: f64, min: f64 },

    #[error("failed to encode recording: {0}")]
    EncodingFailed(String),
}

/// Errors related to remote speech-to-text transcription
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("{0} is not set. Export your API key before starting.")]
    MissingCredential(&'static str),

    #[error("no audio data to transcribe")]
    EmptyAudio,

    #[error("network error: {0}")]
    Network(String),

    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unreadable API response: {0}")]
    BadResponse(String),
}

/// Errors related to text output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("ydotool daemon not running.\n  Start with: systemctl --user start ydotool")]
    YdotoolNotRunning,

    #[error("ydotool not found in PATH. Install via your package manager.")]
    YdotoolNotFound,

    #[error("wtype not found in PATH. Install via your package manager.")]
    WtypeNotFound,

    #[error("wl-copy not found in PATH. Install wl-clipboard via your package manager.")]
    WlCopyNotFound,

    #[error("Text injection failed: {0}")]
    InjectionFailed(String),

    #[error("All output methods failed. Ensure wtype, ydotool, or wl-copy is available.")]
    AllMethodsFailed,
}

/// Result type alias using HotscribeError
pub type Result<T> = std::result::Result<T, HotscribeError>;
