//! Audio capture and encoding
//!
//! Capture uses cpal, which works with PipeWire, PulseAudio, and ALSA
//! backends; encoding produces WAV containers via hound.

pub mod capture;
pub mod encode;

use crate::config::AudioSettings;
use crate::error::AudioError;
use crate::session::CaptureShared;
use std::sync::Arc;

/// An open input stream; closing releases the device.
pub trait CaptureStream: Send {
    fn close(self: Box<Self>) -> Result<(), AudioError>;
}

/// Opens capture streams that feed frames into a session's shared buffer.
///
/// The stream's callback must deliver frames through [`CaptureShared::push`],
/// which enforces the recording gate.
pub trait CaptureBackend: Send + Sync {
    fn open(
        &self,
        settings: &AudioSettings,
        sink: Arc<CaptureShared>,
    ) -> Result<Box<dyn CaptureStream>, AudioError>;
}

/// Factory function for the default (cpal) capture backend
pub fn create_backend() -> Box<dyn CaptureBackend> {
    Box::new(capture::CpalBackend)
}
