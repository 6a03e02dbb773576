//! wtype-based text output
//!
//! Uses wtype to simulate keyboard input on Wayland. Preferred because it
//! needs no daemon and handles Unicode well.

use super::TextOutput;
use crate::error::OutputError;
use std::process::Stdio;
use tokio::process::Command;

/// wtype-based text output
pub struct WtypeOutput;

impl WtypeOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WtypeOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextOutput for WtypeOutput {
    async fn output(&self, text: &str) -> Result<(), OutputError> {
        if text.is_empty() {
            return Ok(());
        }

        // The -- ensures text starting with - isn't treated as an option
        let output = Command::new("wtype")
            .arg("--")
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OutputError::WtypeNotFound
                } else {
                    OutputError::InjectionFailed(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OutputError::InjectionFailed(format!(
                "wtype failed: {}",
                stderr
            )));
        }

        tracing::info!("Text typed via wtype ({} chars)", text.chars().count());
        Ok(())
    }

    async fn is_available(&self) -> bool {
        // Only check PATH; wtype fails naturally if Wayland isn't up
        Command::new("which")
            .arg("wtype")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "wtype"
    }
}
