//! Command-line interface definitions for hotscribe
//!
//! Kept in its own module so the binary stays a thin dispatch layer.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hotscribe")]
#[command(author, version, about = "Hold-to-record dictation pasted at your cursor")]
#[command(long_about = "
Hotscribe is a push-to-talk dictation tool.
Hold a hotkey to record, release to transcribe via a cloud speech-to-text
API and paste the text at the cursor position.

SETUP:
  1. Add yourself to the input group: sudo usermod -aG input $USER
  2. Log out and back in
  3. Install wtype (Wayland) or ydotool for typing support
  4. Export your API key: export OPENAI_API_KEY=sk-...
  5. Run: hotscribe (to start the daemon)

USAGE:
  Hold ScrollLock (default) while speaking, release to transcribe.
  Text is typed at the cursor, or copied to the clipboard as fallback.
  Language, model and timestamp prefix can be changed without a restart
  via `hotscribe settings`.
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Force clipboard mode (don't try to type)
    #[arg(long)]
    pub clipboard: bool,

    /// Override the transcription model
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Override the language hint (ISO code, empty = auto-detect)
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Override the hotkey (e.g., SCROLLLOCK, PAUSE, F13)
    #[arg(long, value_name = "KEY")]
    pub hotkey: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as daemon (default if no command specified)
    Daemon,

    /// Transcribe a WAV file and print the text
    Transcribe {
        /// Path to audio file
        file: PathBuf,
    },

    /// Show current configuration
    Config,

    /// Show or edit the runtime settings (applied without a restart)
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show the effective runtime settings
    Show,

    /// Set the transcription language hint (ISO code)
    Language {
        /// Language code, e.g. en, de, pt
        code: String,
    },

    /// Set the transcription model
    Model {
        /// Model name, e.g. whisper-1
        name: String,
    },

    /// Enable or disable the timestamp prefix on pasted text
    Timestamp {
        /// on/off (also accepts true/false, yes/no)
        #[arg(value_parser = clap::builder::BoolishValueParser::new())]
        enabled: bool,
    },
}
