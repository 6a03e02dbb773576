//! Speech-to-text transcription via a remote OpenAI-compatible API
//!
//! The transcriber takes a finalized WAV byte buffer; per-call parameters
//! come from the resolved runtime settings so language/model edits apply
//! to the very next recording.

pub mod remote;

use crate::config::TranscriptionSettings;
use crate::error::TranscribeError;

/// Trait for speech-to-text implementations
pub trait Transcriber: Send + Sync {
    /// Transcribe a WAV byte buffer to text.
    ///
    /// An empty recognized text is a valid result (silence), distinct from
    /// a transport or API failure.
    fn transcribe(
        &self,
        wav: &[u8],
        options: &TranscriptionSettings,
    ) -> Result<String, TranscribeError>;
}

/// Factory function for the remote transcriber.
///
/// Fails fast with `MissingCredential` when no API key is present in the
/// environment; no call could ever succeed without it.
pub fn create_transcriber() -> Result<Box<dyn Transcriber>, TranscribeError> {
    Ok(Box::new(remote::RemoteTranscriber::from_env()?))
}
