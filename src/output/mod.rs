//! Text output module
//!
//! Delivers recognized text at the cursor via keyboard simulation or the
//! clipboard.
//!
//! Fallback chain for `mode = "type"`:
//! 1. wtype - Wayland-native, best Unicode support, no daemon needed
//! 2. ydotool - works on X11/Wayland/TTY, requires daemon
//! 3. clipboard - universal fallback via wl-copy

pub mod clipboard;
pub mod wtype;
pub mod ydotool;

use crate::config::{OutputMode, OutputSettings};
use crate::error::OutputError;

/// Format of the optional timestamp prefix: 2-digit year, space separated
pub const TIMESTAMP_FORMAT: &str = "%y %m %d %H:%M:%S";

/// Prefix text with the current wall-clock timestamp
pub fn prefix_timestamp(text: &str) -> String {
    format!("{} {}", chrono::Local::now().format(TIMESTAMP_FORMAT), text)
}

/// Trait for text output implementations
#[async_trait::async_trait]
pub trait TextOutput: Send + Sync {
    /// Output text (type it or copy to clipboard)
    async fn output(&self, text: &str) -> Result<(), OutputError>;

    /// Check if this output method is available
    async fn is_available(&self) -> bool;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Factory function that returns a fallback chain of output methods
pub fn create_output_chain(settings: &OutputSettings) -> Vec<Box<dyn TextOutput>> {
    let mut chain: Vec<Box<dyn TextOutput>> = Vec::new();

    match settings.mode {
        OutputMode::Type => {
            chain.push(Box::new(wtype::WtypeOutput::new()));
            chain.push(Box::new(ydotool::YdotoolOutput::new(settings.type_delay_ms)));
            if settings.fallback_to_clipboard {
                chain.push(Box::new(clipboard::ClipboardOutput::new()));
            }
        }
        OutputMode::Clipboard => {
            chain.push(Box::new(clipboard::ClipboardOutput::new()));
        }
    }

    chain
}

/// Try each output method in the chain until one succeeds
pub async fn output_with_fallback(
    chain: &[Box<dyn TextOutput>],
    text: &str,
) -> Result<(), OutputError> {
    for output in chain {
        if !output.is_available().await {
            tracing::debug!("{} not available, trying next", output.name());
            continue;
        }

        match output.output(text).await {
            Ok(()) => {
                tracing::debug!("Text output via {}", output.name());
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("{} failed: {}, trying next", output.name(), e);
            }
        }
    }

    Err(OutputError::AllMethodsFailed)
}
