//! Daemon module - main event loop orchestration
//!
//! Coordinates the hotkey listener, the recording session, the remote
//! transcriber, and the text output chain: press starts a session, release
//! stops it, saves the buffer, transcribes it, and pastes the text.

use crate::audio::{self, CaptureBackend};
use crate::config::{Config, RuntimeSettings};
use crate::error::{Result, SessionError};
use crate::hotkey::{self, HotkeyEvent};
use crate::notification;
use crate::output::{self, TextOutput};
use crate::session::RecordingSession;
use crate::transcribe::{self, Transcriber};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};

/// Main daemon that orchestrates all components
pub struct Daemon {
    config: Config,
    runtime_store: PathBuf,
}

impl Daemon {
    /// Create a new daemon with the given configuration
    pub fn new(config: Config) -> Self {
        Self {
            config,
            runtime_store: Config::runtime_store_path(),
        }
    }

    /// Run the daemon main loop
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting hotscribe daemon");

        // Fail fast on a missing credential; no transcription can ever
        // succeed without it.
        let transcriber: Arc<dyn Transcriber> = Arc::from(transcribe::create_transcriber()?);

        let backend = audio::create_backend();

        let output_chain = output::create_output_chain(&self.config.output);
        tracing::debug!(
            "Output chain: {}",
            output_chain
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        let mut listener = hotkey::create_listener(&self.config.hotkey)?;
        let mut hotkey_rx = listener.start().await?;

        let mut sigterm = signal(SignalKind::terminate())?;

        tracing::info!("Runtime store: {:?}", self.runtime_store);
        tracing::info!(
            "Hold {} to record, release to transcribe",
            self.config.hotkey.key
        );

        // One active session per process; None between recordings
        let mut session: Option<RecordingSession> = None;
        let max_duration = Duration::from_secs(u64::from(self.config.audio.max_duration_secs));

        loop {
            tokio::select! {
                Some(event) = hotkey_rx.recv() => match event {
                    HotkeyEvent::Pressed => {
                        if session.is_none() {
                            session = self.begin_recording(backend.as_ref()).await;
                        }
                    }
                    HotkeyEvent::Released => {
                        if let Some(active) = session.take() {
                            self.finish_recording(active, Arc::clone(&transcriber), &output_chain)
                                .await;
                        }
                    }
                },

                // Safety stop for runaway recordings (stuck key, missed release)
                _ = tokio::time::sleep(Duration::from_millis(100)), if session.is_some() => {
                    let over_limit = session
                        .as_ref()
                        .map(|s| s.duration() > max_duration)
                        .unwrap_or(false);
                    if over_limit {
                        tracing::warn!(
                            "Recording timeout ({}s limit), discarding",
                            max_duration.as_secs()
                        );
                        if let Some(mut active) = session.take() {
                            active.discard();
                        }
                        notification::send(
                            "Recording stopped",
                            "Maximum duration reached, recording discarded",
                        )
                        .await;
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down...");
                    break;
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down...");
                    break;
                }
            }
        }

        if let Some(mut active) = session.take() {
            active.discard();
        }
        listener.stop().await?;

        tracing::info!("Daemon stopped");
        Ok(())
    }

    /// Create a fresh session and open the capture stream
    async fn begin_recording(&self, backend: &dyn CaptureBackend) -> Option<RecordingSession> {
        let mut session = RecordingSession::new(
            self.config.audio.clone(),
            self.config.recording.clone(),
        );
        match session.start(backend) {
            Ok(()) => Some(session),
            Err(e) => {
                tracing::error!("Failed to start recording: {}", e);
                notification::send("Recording failed", &e.to_string()).await;
                None
            }
        }
    }

    /// Stop, save, transcribe, and paste one finished recording
    async fn finish_recording(
        &self,
        mut session: RecordingSession,
        transcriber: Arc<dyn Transcriber>,
        output_chain: &[Box<dyn TextOutput>],
    ) {
        if !session.stop() {
            return;
        }

        let saved = match session.save(None) {
            Ok(saved) => saved,
            Err(SessionError::TooShort { actual, min }) => {
                tracing::info!(
                    "Recording too short ({:.2}s < {:.2}s), discarding",
                    actual,
                    min
                );
                session.discard();
                return;
            }
            Err(e) => {
                tracing::error!("Failed to save recording: {}", e);
                notification::send("Recording failed", &e.to_string()).await;
                session.discard();
                return;
            }
        };

        // Re-resolved per recording so settings edits apply to this one
        let runtime = RuntimeSettings::resolve(&self.config, &self.runtime_store);
        let options = runtime.transcription.clone();
        let bytes = saved.bytes;

        tracing::info!(
            "Transcribing {:.2}s of audio...",
            session.duration().as_secs_f64()
        );
        let result =
            tokio::task::spawn_blocking(move || transcriber.transcribe(&bytes, &options)).await;

        let text = match result {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::error!("Transcription failed: {}", e);
                notification::send("Transcription failed", &e.to_string()).await;
                return;
            }
            Err(e) => {
                tracing::error!("Transcription task failed: {}", e);
                return;
            }
        };

        if text.is_empty() {
            tracing::debug!("Transcription was empty, nothing to paste");
            return;
        }
        tracing::info!("Transcribed: {:?}", text);

        let text = if runtime.add_timestamp {
            output::prefix_timestamp(&text)
        } else {
            text
        };
        // Trailing space so consecutive dictations don't run together
        let text = format!("{} ", text);

        if let Err(e) = output::output_with_fallback(output_chain, &text).await {
            tracing::error!("Output failed: {}", e);
            notification::send("Paste failed", &e.to_string()).await;
        }
    }
}
