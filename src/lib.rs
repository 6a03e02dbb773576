//! Hotscribe: hold-to-record dictation for the Linux desktop
//!
//! This library provides the core functionality for:
//! - Detecting hotkey presses via evdev (kernel-level, works on all compositors)
//! - Recording audio into an in-memory session with pause/resume/discard
//! - Transcribing recordings via an OpenAI-compatible cloud API
//! - Pasting recognized text at the cursor via wtype/ydotool/clipboard
//!
//! # Flow
//!
//! ```text
//! [hotkey press] ─▶ session.start() ─▶ frames accumulate (gated append)
//! [hotkey release] ─▶ session.stop() ─▶ session.save() ─▶ WAV bytes
//!                  ─▶ transcriber.transcribe(bytes, runtime settings)
//!                  ─▶ text ─▶ optional timestamp prefix ─▶ output chain
//! ```
//!
//! Language, model, and the timestamp prefix are re-resolved from the
//! runtime store before every transcription, so edits apply to the very
//! next recording with no restart.

pub mod audio;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod hotkey;
pub mod notification;
pub mod output;
pub mod session;
pub mod transcribe;

pub use cli::{Cli, Commands, SettingsAction};
pub use config::Config;
pub use daemon::Daemon;
pub use error::{HotscribeError, Result};
