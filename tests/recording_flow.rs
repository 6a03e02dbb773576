//! End-to-end tests for the record → save → transcribe flow
//!
//! Audio hardware is replaced by a stub capture backend that lets the test
//! push frames through the session's gate, and the transcription endpoint
//! is a local TCP stub so the real HTTP client and parsing are exercised.

use hotscribe::audio::{encode, CaptureBackend, CaptureStream};
use hotscribe::config::{
    AudioSettings, Config, RecordingSettings, ResponseFormat, RuntimeSettings,
    TranscriptionSettings,
};
use hotscribe::error::{AudioError, SessionError, TranscribeError};
use hotscribe::session::{CaptureShared, Lifecycle, RecordingSession};
use hotscribe::transcribe::remote::RemoteTranscriber;
use hotscribe::transcribe::Transcriber;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct NullStream;

impl CaptureStream for NullStream {
    fn close(self: Box<Self>) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Capture backend that opens instantly and produces no frames on its own;
/// tests push frames through the session's shared sink instead.
struct StubBackend;

impl CaptureBackend for StubBackend {
    fn open(
        &self,
        _settings: &AudioSettings,
        _sink: Arc<CaptureShared>,
    ) -> Result<Box<dyn CaptureStream>, AudioError> {
        Ok(Box::new(NullStream))
    }
}

fn lenient_recording() -> RecordingSettings {
    RecordingSettings {
        min_duration_secs: 0.0,
        ..RecordingSettings::default()
    }
}

fn stub_options(endpoint: &str, format: ResponseFormat, max_retries: u32) -> TranscriptionSettings {
    TranscriptionSettings {
        endpoint: endpoint.to_string(),
        response_format: format,
        max_retries,
        timeout_secs: 5,
        ..TranscriptionSettings::default()
    }
}

/// Minimal HTTP endpoint stub: serves up to `max_requests` requests with a
/// fixed response, counting how many requests actually arrived.
fn spawn_stub_endpoint(
    status: u16,
    content_type: &'static str,
    body: &'static str,
    max_requests: usize,
) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub endpoint");
    let addr = listener.local_addr().expect("stub endpoint addr");
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_thread = Arc::clone(&hits);

    std::thread::spawn(move || {
        for _ in 0..max_requests {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            hits_in_thread.fetch_add(1, Ordering::SeqCst);
            drain_http_request(&mut stream);

            let reason = match status {
                200 => "OK",
                500 => "Internal Server Error",
                _ => "Error",
            };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                content_type,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    (format!("http://{}", addr), hits)
}

/// Read one full HTTP request (headers + Content-Length body) off the stream
fn drain_http_request(stream: &mut TcpStream) {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("set stub read timeout");

    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => {
                data.extend_from_slice(&buf[..n]);
                let Some(header_end) = find_subslice(&data, b"\r\n\r\n") else {
                    continue;
                };
                let headers = String::from_utf8_lossy(&data[..header_end]);
                let content_length = headers
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.trim().eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                if data.len() >= header_end + 4 + content_length {
                    return;
                }
            }
            Err(_) => return,
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[test]
fn end_to_end_record_save_transcribe() {
    // Record "3 seconds" of silence at 16 kHz mono 16-bit
    let audio = AudioSettings::default();
    let mut session = RecordingSession::new(audio.clone(), lenient_recording());
    let sink = session.shared();

    session.start(&StubBackend).expect("start recording");
    sink.push(&vec![0.0f32; 48_000]);
    assert!(session.stop());

    let saved = session.save(None).expect("save recording");
    assert_eq!(session.lifecycle(), Lifecycle::Saved);

    // The buffer is a valid container of the expected shape
    let (spec, samples) = encode::decode_wav(&saved.bytes).expect("decode saved buffer");
    assert_eq!(spec.sample_rate, 16_000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(samples.len(), 48_000);

    // Transcribe against a stub endpoint returning a JSON body
    let (endpoint, hits) =
        spawn_stub_endpoint(200, "application/json", r#"{"text": "hallo"}"#, 1);
    let transcriber = RemoteTranscriber::new("test-key".to_string());
    let text = transcriber
        .transcribe(&saved.bytes, &stub_options(&endpoint, ResponseFormat::Json, 1))
        .expect("transcribe against stub");

    assert_eq!(text, "hallo");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn plain_text_response_is_trimmed() {
    let (endpoint, _hits) =
        spawn_stub_endpoint(200, "text/plain", "  hello there \n", 1);
    let transcriber = RemoteTranscriber::new("test-key".to_string());
    let text = transcriber
        .transcribe(&[0u8; 64], &stub_options(&endpoint, ResponseFormat::Text, 1))
        .expect("transcribe plain text");
    assert_eq!(text, "hello there");
}

#[test]
fn empty_recognized_text_is_a_valid_result() {
    let (endpoint, _hits) = spawn_stub_endpoint(200, "application/json", r#"{"text": ""}"#, 1);
    let transcriber = RemoteTranscriber::new("test-key".to_string());
    let text = transcriber
        .transcribe(&[0u8; 64], &stub_options(&endpoint, ResponseFormat::Json, 1))
        .expect("empty text is not a failure");
    assert_eq!(text, "");
}

#[test]
fn retry_bound_is_exact_and_carries_last_cause() {
    // Allow more requests than expected so over-calling would be visible
    let (endpoint, hits) = spawn_stub_endpoint(500, "text/plain", "boom", 5);
    let transcriber = RemoteTranscriber::new("test-key".to_string());

    let result =
        transcriber.transcribe(&[0u8; 64], &stub_options(&endpoint, ResponseFormat::Text, 2));

    match result {
        Err(TranscribeError::Api { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected Api error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 2, "exactly 2 attempts expected");
}

#[test]
fn empty_buffer_never_reaches_the_network() {
    let (endpoint, hits) = spawn_stub_endpoint(200, "application/json", r#"{"text": "x"}"#, 1);
    let transcriber = RemoteTranscriber::new("test-key".to_string());

    let result = transcriber.transcribe(&[], &stub_options(&endpoint, ResponseFormat::Json, 3));

    assert!(matches!(result, Err(TranscribeError::EmptyAudio)));
    assert_eq!(hits.load(Ordering::SeqCst), 0, "no network call expected");
}

#[test]
fn runtime_store_falls_back_per_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = dir.path().join("runtime_config.json");
    std::fs::write(&store, r#"{"transcription": {"language": "de"}}"#).expect("write store");

    let config = Config::default();
    let settings = RuntimeSettings::resolve(&config, &store);

    assert_eq!(settings.transcription.language, "de");
    assert_eq!(settings.transcription.model, "whisper-1"); // compiled-in default
}

#[test]
fn save_to_file_persists_the_same_bytes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let recording = RecordingSettings {
        save_to_file: true,
        output_directory: Some(dir.path().to_path_buf()),
        min_duration_secs: 0.0,
        ..RecordingSettings::default()
    };

    let mut session = RecordingSession::new(AudioSettings::default(), recording);
    let sink = session.shared();
    session.start(&StubBackend).expect("start recording");
    sink.push(&vec![0.25f32; 1024]);
    session.stop();

    let saved = session.save(Some("note")).expect("save recording");
    let path = saved.path.expect("file path when save_to_file is on");
    assert!(path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("note_") && n.ends_with(".wav")));

    let on_disk = std::fs::read(&path).expect("read persisted recording");
    assert_eq!(on_disk, saved.bytes);
}

#[test]
fn stopping_keeps_frames_until_a_decision_is_made() {
    let mut session = RecordingSession::new(AudioSettings::default(), lenient_recording());
    let sink = session.shared();
    session.start(&StubBackend).expect("start recording");
    sink.push(&vec![0.5f32; 512]);
    session.stop();

    // Frames survive stop so duration can be inspected first
    assert_eq!(session.frame_count(), 512);
    assert!(session.duration() >= Duration::ZERO);

    // Discard releases them and save becomes invalid
    assert!(session.discard());
    assert_eq!(session.frame_count(), 0);
    assert!(matches!(
        session.save(None),
        Err(SessionError::InvalidState { .. })
    ));
}
