//! ydotool-based text output
//!
//! Works on all Wayland compositors and X11 because ydotool uses the uinput
//! kernel interface. Requires the ydotoold daemon to be running.

use super::TextOutput;
use crate::error::OutputError;
use std::process::Stdio;
use tokio::process::Command;

/// ydotool-based text output
pub struct YdotoolOutput {
    /// Delay between keypresses in milliseconds
    delay_ms: u32,
}

impl YdotoolOutput {
    pub fn new(delay_ms: u32) -> Self {
        Self { delay_ms }
    }
}

#[async_trait::async_trait]
impl TextOutput for YdotoolOutput {
    async fn output(&self, text: &str) -> Result<(), OutputError> {
        if text.is_empty() {
            return Ok(());
        }

        let mut cmd = Command::new("ydotool");
        cmd.arg("type");

        if self.delay_ms > 0 {
            cmd.arg("--key-delay").arg(self.delay_ms.to_string());
            cmd.arg("--key-hold").arg(self.delay_ms.to_string());
        }

        // The -- ensures text starting with - isn't treated as an option
        cmd.arg("--").arg(text);

        let output = cmd
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OutputError::YdotoolNotFound
                } else {
                    OutputError::InjectionFailed(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);

            if stderr.contains("socket") || stderr.contains("connect") || stderr.contains("daemon")
            {
                return Err(OutputError::YdotoolNotRunning);
            }

            return Err(OutputError::InjectionFailed(stderr.to_string()));
        }

        tracing::info!("Text typed via ydotool ({} chars)", text.chars().count());
        Ok(())
    }

    async fn is_available(&self) -> bool {
        Command::new("which")
            .arg("ydotool")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "ydotool"
    }
}
