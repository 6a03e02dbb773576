//! Desktop notifications
//!
//! Best-effort notify-send wrapper used for the user-facing failure classes
//! (device unavailable, transcription failed). Failures to notify are
//! logged, never propagated.

use std::process::Stdio;
use tokio::process::Command;

/// Send a desktop notification with the given title and body.
pub async fn send(title: &str, body: &str) {
    let result = Command::new("notify-send")
        .args(["--app-name=Hotscribe", "--expire-time=3000", title, body])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Err(e) = result {
        tracing::debug!("Failed to send notification: {}", e);
    }
}
