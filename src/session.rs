//! In-memory recording session
//!
//! A session owns one capture stream and the frames it produced, and walks
//! the lifecycle Idle → Recording ⇄ Paused → Stopped → Saved | Discarded.
//! It is single-use: after save() or discard() a new session must be created.
//!
//! The audio callback and the controlling thread share only [`CaptureShared`]:
//! the callback appends frames after checking an atomic lifecycle gate, and
//! the controlling thread is the only writer of that gate. No frame can land
//! once the gate has left Recording.

use crate::audio::{CaptureBackend, CaptureStream};
use crate::config::{AudioSettings, RecordingSettings};
use crate::error::SessionError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Lifecycle {
    /// Created, no stream opened yet
    Idle = 0,
    /// Stream open, frames accumulating
    Recording = 1,
    /// Stream open, frame capture suspended
    Paused = 2,
    /// Stream closed, frames retained for save or discard
    Stopped = 3,
    /// Frames encoded and handed out (terminal)
    Saved = 4,
    /// Frames released without saving (terminal)
    Discarded = 5,
}

impl Lifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Idle => "idle",
            Lifecycle::Recording => "recording",
            Lifecycle::Paused => "paused",
            Lifecycle::Stopped => "stopped",
            Lifecycle::Saved => "saved",
            Lifecycle::Discarded => "discarded",
        }
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State shared between the controlling thread and the audio callback.
///
/// The callback only appends (through [`CaptureShared::push`]); the session
/// only transitions the gate. The gate check makes a pause/stop visible to
/// the callback before its next append.
pub struct CaptureShared {
    gate: AtomicU8,
    frames: Mutex<Vec<f32>>,
}

impl CaptureShared {
    fn new() -> Self {
        Self {
            gate: AtomicU8::new(Lifecycle::Idle as u8),
            frames: Mutex::new(Vec::new()),
        }
    }

    fn set_gate(&self, state: Lifecycle) {
        self.gate.store(state as u8, Ordering::Release);
    }

    /// Append captured frames; ignored unless the session is recording.
    ///
    /// Called from the audio callback context.
    pub fn push(&self, chunk: &[f32]) {
        if self.gate.load(Ordering::Acquire) != Lifecycle::Recording as u8 {
            return;
        }
        if let Ok(mut frames) = self.frames.lock() {
            frames.extend_from_slice(chunk);
        }
    }

    fn snapshot(&self) -> Vec<f32> {
        self.frames.lock().map(|f| f.clone()).unwrap_or_default()
    }

    fn clear(&self) {
        if let Ok(mut frames) = self.frames.lock() {
            frames.clear();
            frames.shrink_to_fit();
        }
    }

    fn len(&self) -> usize {
        self.frames.lock().map(|f| f.len()).unwrap_or(0)
    }
}

/// Result of a successful save
#[derive(Debug)]
pub struct SavedRecording {
    /// The encoded WAV container
    pub bytes: Vec<u8>,
    /// Where the recording was persisted, when save_to_file is enabled
    pub path: Option<PathBuf>,
}

/// One record → stop → save-or-discard cycle
pub struct RecordingSession {
    audio: AudioSettings,
    recording: RecordingSettings,
    lifecycle: Lifecycle,
    shared: Arc<CaptureShared>,
    stream: Option<Box<dyn CaptureStream>>,
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl RecordingSession {
    /// Create an idle session; audio parameters are fixed from here on
    pub fn new(audio: AudioSettings, recording: RecordingSettings) -> Self {
        Self {
            audio,
            recording,
            lifecycle: Lifecycle::Idle,
            shared: Arc::new(CaptureShared::new()),
            stream: None,
            started_at: None,
            stopped_at: None,
            paused_at: None,
            paused_total: Duration::ZERO,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Handle shared with the capture callback (the backend's frame sink)
    pub fn shared(&self) -> Arc<CaptureShared> {
        Arc::clone(&self.shared)
    }

    /// Number of frames accumulated so far
    pub fn frame_count(&self) -> usize {
        self.shared.len()
    }

    /// Open the capture stream and begin accumulating frames.
    ///
    /// Valid only from idle. If no input device can be opened the session
    /// stays idle with nothing to clean up.
    pub fn start(&mut self, backend: &dyn CaptureBackend) -> Result<(), SessionError> {
        if self.lifecycle != Lifecycle::Idle {
            tracing::warn!("Cannot start: session is {}", self.lifecycle);
            return Err(SessionError::InvalidState {
                op: "start",
                state: self.lifecycle.as_str(),
            });
        }

        let stream = backend.open(&self.audio, self.shared())?;

        self.shared.set_gate(Lifecycle::Recording);
        self.stream = Some(stream);
        self.started_at = Some(Instant::now());
        self.paused_total = Duration::ZERO;
        self.lifecycle = Lifecycle::Recording;

        tracing::info!(
            "Recording started ({} Hz, {} ch, {} bit)",
            self.audio.sample_rate,
            self.audio.channels,
            self.audio.bit_depth
        );
        Ok(())
    }

    /// Suspend frame capture without closing the device.
    ///
    /// Returns false from any state other than recording.
    pub fn pause(&mut self) -> bool {
        if self.lifecycle != Lifecycle::Recording {
            tracing::warn!("Cannot pause: session is {}", self.lifecycle);
            return false;
        }
        self.shared.set_gate(Lifecycle::Paused);
        self.paused_at = Some(Instant::now());
        self.lifecycle = Lifecycle::Paused;
        tracing::info!("Recording paused");
        true
    }

    /// Resume frame capture after a pause.
    ///
    /// Returns false from any state other than paused.
    pub fn resume(&mut self) -> bool {
        if self.lifecycle != Lifecycle::Paused {
            tracing::warn!("Cannot resume: session is {}", self.lifecycle);
            return false;
        }
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += paused_at.elapsed();
        }
        self.shared.set_gate(Lifecycle::Recording);
        self.lifecycle = Lifecycle::Recording;
        tracing::info!("Recording resumed");
        true
    }

    /// Close the capture stream but keep the accumulated frames.
    ///
    /// Valid from recording or paused; the caller can then inspect
    /// duration() before deciding between save() and discard().
    pub fn stop(&mut self) -> bool {
        if !matches!(self.lifecycle, Lifecycle::Recording | Lifecycle::Paused) {
            tracing::warn!("Cannot stop: session is {}", self.lifecycle);
            return false;
        }

        // Close the gate first so the callback cannot append past this point.
        self.shared.set_gate(Lifecycle::Stopped);

        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += paused_at.elapsed();
        }
        self.stopped_at = Some(Instant::now());

        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.close() {
                tracing::warn!("Error closing capture stream: {}", e);
            }
        }

        self.lifecycle = Lifecycle::Stopped;
        tracing::info!(
            "Recording stopped ({:.2}s, {} frames)",
            self.duration().as_secs_f64(),
            self.frame_count()
        );
        true
    }

    /// Elapsed recording time, excluding paused intervals.
    ///
    /// Zero before start(); frozen once stopped.
    pub fn duration(&self) -> Duration {
        let Some(started_at) = self.started_at else {
            return Duration::ZERO;
        };
        let end = self.stopped_at.unwrap_or_else(Instant::now);
        let mut paused = self.paused_total;
        if let Some(paused_at) = self.paused_at {
            paused += paused_at.elapsed();
        }
        end.duration_since(started_at).saturating_sub(paused)
    }

    /// Encode the accumulated frames into a WAV byte buffer.
    ///
    /// Valid only from stopped. Too little audio yields `TooShort` and the
    /// session stays stopped so the caller can still discard. When
    /// save_to_file is enabled the buffer is also written to
    /// `<base>_<timestamp>.wav`; a disk error there is logged and the
    /// in-memory buffer is still returned.
    pub fn save(&mut self, custom_name: Option<&str>) -> Result<SavedRecording, SessionError> {
        if self.lifecycle != Lifecycle::Stopped {
            tracing::warn!("Cannot save: session is {}", self.lifecycle);
            return Err(SessionError::InvalidState {
                op: "save",
                state: self.lifecycle.as_str(),
            });
        }

        let frames = self.shared.snapshot();
        let recorded_secs = self.duration().as_secs_f64();
        if frames.is_empty() || recorded_secs < self.recording.min_duration_secs {
            tracing::info!(
                "Recording too short to save: {:.2}s, {} frames",
                recorded_secs,
                frames.len()
            );
            return Err(SessionError::TooShort {
                actual: recorded_secs,
                min: self.recording.min_duration_secs,
            });
        }

        let bytes = crate::audio::encode::encode_wav(&frames, &self.audio)
            .map_err(|e| SessionError::EncodingFailed(e.to_string()))?;

        let path = if self.recording.save_to_file {
            match self.write_to_disk(&bytes, custom_name) {
                Ok(path) => {
                    tracing::info!("Recording saved to {:?}", path);
                    Some(path)
                }
                Err(e) => {
                    tracing::error!("Failed to persist recording to disk: {}", e);
                    None
                }
            }
        } else {
            None
        };

        self.shared.set_gate(Lifecycle::Saved);
        self.lifecycle = Lifecycle::Saved;
        tracing::info!("Recording saved ({} bytes)", bytes.len());
        Ok(SavedRecording { bytes, path })
    }

    /// Release the accumulated frames without saving.
    ///
    /// Valid from stopped, or from recording/paused (which stops first).
    pub fn discard(&mut self) -> bool {
        match self.lifecycle {
            Lifecycle::Recording | Lifecycle::Paused => {
                self.stop();
            }
            Lifecycle::Stopped => {}
            other => {
                tracing::warn!("Cannot discard: session is {}", other);
                return false;
            }
        }

        self.shared.set_gate(Lifecycle::Discarded);
        self.shared.clear();
        self.lifecycle = Lifecycle::Discarded;
        tracing::info!("Recording discarded");
        true
    }

    fn write_to_disk(&self, bytes: &[u8], custom_name: Option<&str>) -> std::io::Result<PathBuf> {
        let dir = self.recording.resolve_output_dir();
        std::fs::create_dir_all(&dir)?;

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let base = custom_name.unwrap_or(&self.recording.base_filename);
        let path = dir.join(format!("{}_{}.wav", base, stamp));
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AudioError;
    use std::time::Duration;

    struct StubStream;

    impl CaptureStream for StubStream {
        fn close(self: Box<Self>) -> Result<(), AudioError> {
            Ok(())
        }
    }

    /// Backend that opens instantly and never produces frames on its own
    struct StubBackend;

    impl CaptureBackend for StubBackend {
        fn open(
            &self,
            _settings: &AudioSettings,
            _sink: Arc<CaptureShared>,
        ) -> Result<Box<dyn CaptureStream>, AudioError> {
            Ok(Box::new(StubStream))
        }
    }

    struct UnavailableBackend;

    impl CaptureBackend for UnavailableBackend {
        fn open(
            &self,
            _settings: &AudioSettings,
            _sink: Arc<CaptureShared>,
        ) -> Result<Box<dyn CaptureStream>, AudioError> {
            Err(AudioError::DeviceNotFound("default".to_string()))
        }
    }

    fn lenient_recording() -> RecordingSettings {
        RecordingSettings {
            min_duration_secs: 0.0,
            ..RecordingSettings::default()
        }
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = RecordingSession::new(AudioSettings::default(), lenient_recording());
        assert_eq!(session.lifecycle(), Lifecycle::Idle);
        assert_eq!(session.duration(), Duration::ZERO);
    }

    #[test]
    fn test_start_failure_leaves_session_idle() {
        let mut session = RecordingSession::new(AudioSettings::default(), lenient_recording());
        let result = session.start(&UnavailableBackend);
        assert!(matches!(result, Err(SessionError::DeviceUnavailable(_))));
        assert_eq!(session.lifecycle(), Lifecycle::Idle);

        // A later start against a working backend still succeeds.
        session.start(&StubBackend).unwrap();
        assert_eq!(session.lifecycle(), Lifecycle::Recording);
    }

    #[test]
    fn test_double_start_is_invalid_state() {
        let mut session = RecordingSession::new(AudioSettings::default(), lenient_recording());
        session.start(&StubBackend).unwrap();
        assert!(matches!(
            session.start(&StubBackend),
            Err(SessionError::InvalidState { op: "start", .. })
        ));
    }

    #[test]
    fn test_pause_resume_gate_frames() {
        let mut session = RecordingSession::new(AudioSettings::default(), lenient_recording());
        let shared = session.shared();

        // Appends before start are ignored.
        shared.push(&[0.1, 0.2]);
        assert_eq!(session.frame_count(), 0);

        session.start(&StubBackend).unwrap();
        shared.push(&[0.1, 0.2]);
        assert_eq!(session.frame_count(), 2);

        assert!(session.pause());
        shared.push(&[0.3, 0.4]);
        assert_eq!(session.frame_count(), 2);

        assert!(session.resume());
        shared.push(&[0.5]);
        assert_eq!(session.frame_count(), 3);

        assert!(session.stop());
        shared.push(&[0.6]);
        assert_eq!(session.frame_count(), 3);
    }

    #[test]
    fn test_pause_resume_only_from_valid_states() {
        let mut session = RecordingSession::new(AudioSettings::default(), lenient_recording());
        assert!(!session.pause());
        assert!(!session.resume());
        assert!(!session.stop());

        session.start(&StubBackend).unwrap();
        assert!(!session.resume()); // not paused
        assert!(session.pause());
        assert!(!session.pause()); // already paused
        assert!(session.stop()); // stop valid from paused
        assert!(!session.stop()); // already stopped
    }

    #[test]
    fn test_duration_tracks_wall_clock_without_pauses() {
        let mut session = RecordingSession::new(AudioSettings::default(), lenient_recording());
        session.start(&StubBackend).unwrap();
        std::thread::sleep(Duration::from_millis(80));
        session.stop();

        let recorded = session.duration();
        assert!(
            recorded >= Duration::from_millis(70) && recorded < Duration::from_millis(300),
            "expected ~80ms of recorded time, got {:?}",
            recorded
        );
    }

    #[test]
    fn test_duration_excludes_paused_time() {
        let mut session = RecordingSession::new(AudioSettings::default(), lenient_recording());
        session.start(&StubBackend).unwrap();
        std::thread::sleep(Duration::from_millis(60));
        session.pause();
        std::thread::sleep(Duration::from_millis(120));
        session.resume();
        std::thread::sleep(Duration::from_millis(60));
        session.stop();

        let recorded = session.duration();
        assert!(
            recorded >= Duration::from_millis(100) && recorded < Duration::from_millis(200),
            "expected ~120ms of recorded time, got {:?}",
            recorded
        );

        // Frozen after stop.
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(session.duration(), recorded);
    }

    #[test]
    fn test_save_from_stopped_matches_direct_encoding() {
        let audio = AudioSettings::default();
        let mut session = RecordingSession::new(audio.clone(), lenient_recording());
        let shared = session.shared();
        session.start(&StubBackend).unwrap();
        let frames: Vec<f32> = (0..256).map(|i| (i as f32 / 256.0) - 0.5).collect();
        shared.push(&frames);
        session.stop();

        let saved = session.save(None).unwrap();
        assert_eq!(session.lifecycle(), Lifecycle::Saved);
        assert!(saved.path.is_none());

        let direct = crate::audio::encode::encode_wav(&frames, &audio).unwrap();
        assert_eq!(saved.bytes, direct);
    }

    #[test]
    fn test_save_invalid_outside_stopped() {
        let mut session = RecordingSession::new(AudioSettings::default(), lenient_recording());
        assert!(matches!(
            session.save(None),
            Err(SessionError::InvalidState { op: "save", .. })
        ));

        session.start(&StubBackend).unwrap();
        session.shared().push(&[0.0; 64]);
        assert!(matches!(
            session.save(None),
            Err(SessionError::InvalidState { .. })
        ));
        // Misuse never touches the accumulated frames.
        assert_eq!(session.frame_count(), 64);
    }

    #[test]
    fn test_save_rejects_too_short() {
        let recording = RecordingSettings {
            min_duration_secs: 60.0,
            ..RecordingSettings::default()
        };
        let mut session = RecordingSession::new(AudioSettings::default(), recording);
        session.start(&StubBackend).unwrap();
        session.shared().push(&[0.0; 128]);
        session.stop();

        assert!(matches!(
            session.save(None),
            Err(SessionError::TooShort { .. })
        ));
        // Still stopped: the caller decides what to do next.
        assert_eq!(session.lifecycle(), Lifecycle::Stopped);
        assert!(session.discard());
    }

    #[test]
    fn test_save_rejects_empty_frames() {
        let mut session = RecordingSession::new(AudioSettings::default(), lenient_recording());
        session.start(&StubBackend).unwrap();
        session.stop();
        assert!(matches!(
            session.save(None),
            Err(SessionError::TooShort { .. })
        ));
    }

    #[test]
    fn test_discard_releases_frames_and_blocks_save() {
        let mut session = RecordingSession::new(AudioSettings::default(), lenient_recording());
        session.start(&StubBackend).unwrap();
        session.shared().push(&[0.0; 32]);
        session.stop();

        assert!(session.discard());
        assert_eq!(session.lifecycle(), Lifecycle::Discarded);
        assert_eq!(session.frame_count(), 0);
        assert!(matches!(
            session.save(None),
            Err(SessionError::InvalidState { .. })
        ));
        assert!(!session.discard()); // terminal
    }

    #[test]
    fn test_discard_while_recording_stops_first() {
        let mut session = RecordingSession::new(AudioSettings::default(), lenient_recording());
        session.start(&StubBackend).unwrap();
        session.shared().push(&[0.0; 32]);
        assert!(session.discard());
        assert_eq!(session.lifecycle(), Lifecycle::Discarded);
        assert_eq!(session.frame_count(), 0);
    }
}
