//! Remote transcription via an OpenAI-compatible API
//!
//! Sends the recorded WAV buffer as a multipart request and returns the
//! recognized text. Failed attempts are retried back-to-back up to the
//! configured total-attempt bound; the timeout applies per attempt.

use super::Transcriber;
use crate::config::{Config, ResponseFormat, TranscriptionSettings};
use crate::error::TranscribeError;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the bearer credential
pub const CREDENTIAL_ENV: &str = "OPENAI_API_KEY";

/// Environment flags that enable the debug copy of transmitted audio
const DEBUG_AUDIO_ENVS: [&str; 2] = ["SAVE_DEBUG_AUDIO", "DEBUG_MODE"];

/// Remote transcriber using an OpenAI-compatible Whisper API
pub struct RemoteTranscriber {
    /// Bearer credential presented to the endpoint
    api_key: String,
    /// Where debug copies of transmitted audio land
    debug_dir: PathBuf,
}

impl RemoteTranscriber {
    /// Create a transcriber with the credential from the process environment
    pub fn from_env() -> Result<Self, TranscribeError> {
        let api_key = std::env::var(CREDENTIAL_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or(TranscribeError::MissingCredential(CREDENTIAL_ENV))?;
        Ok(Self::new(api_key))
    }

    /// Create a transcriber with an explicit credential
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            debug_dir: Config::debug_audio_dir(),
        }
    }

    /// Build the multipart form body for the API request
    fn build_multipart_body(
        &self,
        wav: &[u8],
        options: &TranscriptionSettings,
    ) -> (String, Vec<u8>) {
        let boundary = format!(
            "----HotscribeBoundary{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );

        let mut body = Vec::new();
        let mut field = |name: &str, value: &str| {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            );
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        };

        field("model", &options.model);
        if !options.language.is_empty() {
            field("language", &options.language);
        }
        if !options.prompt.is_empty() {
            field("prompt", &options.prompt);
        }
        field("temperature", &options.temperature.to_string());
        let format_name = match options.response_format {
            ResponseFormat::Text => "text",
            ResponseFormat::Json => "json",
        };
        field("response_format", format_name);

        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"audio.wav\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: audio/wav\r\n\r\n");
        body.extend_from_slice(wav);
        body.extend_from_slice(b"\r\n");

        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        (boundary, body)
    }

    /// One network attempt: send the request and parse the configured format
    fn send_once(
        &self,
        options: &TranscriptionSettings,
        boundary: &str,
        body: &[u8],
    ) -> Result<String, TranscribeError> {
        let response = ureq::post(&options.endpoint)
            .timeout(Duration::from_secs(options.timeout_secs))
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={}", boundary),
            )
            .send_bytes(body)
            .map_err(|e| match e {
                ureq::Error::Status(status, resp) => TranscribeError::Api {
                    status,
                    body: resp.into_string().unwrap_or_default(),
                },
                ureq::Error::Transport(t) => TranscribeError::Network(t.to_string()),
            })?;

        match options.response_format {
            ResponseFormat::Json => {
                let json: serde_json::Value = response
                    .into_json()
                    .map_err(|e| TranscribeError::BadResponse(e.to_string()))?;
                // An absent "text" field means silence, not a failure
                Ok(json
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string())
            }
            ResponseFormat::Text => response
                .into_string()
                .map_err(|e| TranscribeError::BadResponse(e.to_string())),
        }
    }

    /// Write the exact bytes about to be sent to the diagnostics directory.
    ///
    /// Only active when SAVE_DEBUG_AUDIO (or DEBUG_MODE) is set; never fails
    /// the transcription path.
    fn dump_debug_copy(&self, wav: &[u8]) {
        if !debug_audio_enabled() {
            return;
        }

        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let path = self.debug_dir.join(format!("api_request_{}.wav", stamp));
        let result =
            std::fs::create_dir_all(&self.debug_dir).and_then(|_| std::fs::write(&path, wav));
        match result {
            Ok(()) => tracing::debug!("Saved API request audio to {:?}", path),
            Err(e) => tracing::warn!("Failed to save debug audio copy: {}", e),
        }
    }
}

impl Transcriber for RemoteTranscriber {
    fn transcribe(
        &self,
        wav: &[u8],
        options: &TranscriptionSettings,
    ) -> Result<String, TranscribeError> {
        if wav.is_empty() {
            tracing::warn!("No audio data received for transcription");
            return Err(TranscribeError::EmptyAudio);
        }

        tracing::debug!(
            "Audio payload: {} bytes ({:.2} KB), model={}, language={:?}",
            wav.len(),
            wav.len() as f64 / 1024.0,
            options.model,
            options.language
        );

        self.dump_debug_copy(wav);

        let (boundary, body) = self.build_multipart_body(wav, options);
        let attempts = options.max_retries.max(1);
        let endpoint = options.endpoint.clone();

        let start = std::time::Instant::now();
        let text = with_attempts(attempts, |attempt| {
            tracing::debug!("Sending audio to {} (attempt {}/{})", endpoint, attempt, attempts);
            self.send_once(options, &boundary, &body)
        })?;

        let text = text.trim().to_string();
        tracing::info!(
            "Transcription completed in {:.2}s: {:?}",
            start.elapsed().as_secs_f32(),
            preview(&text)
        );
        Ok(text)
    }
}

/// Run `attempt_fn` up to `attempts` times back-to-back, returning the first
/// success or the last failure. `attempts` is the total bound: 1 means a
/// single attempt with no retry.
fn with_attempts<F>(attempts: u32, mut attempt_fn: F) -> Result<String, TranscribeError>
where
    F: FnMut(u32) -> Result<String, TranscribeError>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match attempt_fn(attempt) {
            Ok(text) => return Ok(text),
            Err(err) => {
                tracing::warn!("Transcription attempt {}/{} failed: {}", attempt, attempts, err);
                if attempt >= attempts {
                    return Err(err);
                }
            }
        }
    }
}

fn debug_audio_enabled() -> bool {
    DEBUG_AUDIO_ENVS
        .iter()
        .any(|name| std::env::var_os(name).is_some_and(|v| !v.is_empty()))
}

fn preview(text: &str) -> String {
    if text.chars().count() > 50 {
        format!("{}...", text.chars().take(50).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> TranscriptionSettings {
        TranscriptionSettings {
            endpoint: "http://127.0.0.1:9".to_string(),
            language: "en".to_string(),
            prompt: "dictated note".to_string(),
            ..TranscriptionSettings::default()
        }
    }

    #[test]
    fn test_empty_buffer_fails_before_any_attempt() {
        let transcriber = RemoteTranscriber::new("test-key".to_string());
        let result = transcriber.transcribe(&[], &options());
        assert!(matches!(result, Err(TranscribeError::EmptyAudio)));
    }

    #[test]
    fn test_multipart_body_structure() {
        let transcriber = RemoteTranscriber::new("test-key".to_string());
        let wav = vec![0u8; 100];

        let (boundary, body) = transcriber.build_multipart_body(&wav, &options());
        let body_str = String::from_utf8_lossy(&body);

        assert!(body_str.contains(&boundary));
        assert!(body_str.contains("name=\"file\""));
        assert!(body_str.contains("filename=\"audio.wav\""));
        assert!(body_str.contains("name=\"model\""));
        assert!(body_str.contains("whisper-1"));
        assert!(body_str.contains("name=\"language\""));
        assert!(body_str.contains("name=\"prompt\""));
        assert!(body_str.contains("dictated note"));
        assert!(body_str.contains("name=\"temperature\""));
        assert!(body_str.contains("name=\"response_format\""));
        assert!(body_str.contains("text"));
        assert!(body_str.ends_with(&format!("--{}--\r\n", boundary)));
    }

    #[test]
    fn test_multipart_body_omits_empty_language_and_prompt() {
        let transcriber = RemoteTranscriber::new("test-key".to_string());
        let opts = TranscriptionSettings::default(); // empty language and prompt

        let (_, body) = transcriber.build_multipart_body(&[0u8; 4], &opts);
        let body_str = String::from_utf8_lossy(&body);

        assert!(!body_str.contains("name=\"language\""));
        assert!(!body_str.contains("name=\"prompt\""));
    }

    #[test]
    fn test_with_attempts_bound_is_total_not_extra() {
        let mut calls = 0;
        let result = with_attempts(2, |_| {
            calls += 1;
            Err::<String, _>(TranscribeError::Network("refused".to_string()))
        });
        assert_eq!(calls, 2);
        assert!(matches!(result, Err(TranscribeError::Network(_))));
    }

    #[test]
    fn test_with_attempts_zero_means_single_attempt() {
        let mut calls = 0;
        let _ = with_attempts(0, |_| {
            calls += 1;
            Err::<String, _>(TranscribeError::Network("refused".to_string()))
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_with_attempts_stops_on_success() {
        let mut calls = 0;
        let result = with_attempts(5, |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(TranscribeError::Network("flaky".to_string()))
            } else {
                Ok("hello".to_string())
            }
        });
        assert_eq!(calls, 3);
        assert_eq!(result.unwrap(), "hello");
    }

    #[test]
    fn test_with_attempts_returns_last_error() {
        let mut calls = 0;
        let result = with_attempts(3, |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(TranscribeError::Network("transient".to_string()))
            } else {
                Err(TranscribeError::Api {
                    status: 500,
                    body: "final".to_string(),
                })
            }
        });
        assert_eq!(calls, 3);
        assert!(matches!(
            result,
            Err(TranscribeError::Api { status: 500, .. })
        ));
    }

    #[test]
    fn test_from_env_requires_credential() {
        std::env::remove_var(CREDENTIAL_ENV);
        assert!(matches!(
            RemoteTranscriber::from_env(),
            Err(TranscribeError::MissingCredential(CREDENTIAL_ENV))
        ));

        std::env::set_var(CREDENTIAL_ENV, "sk-test");
        assert!(RemoteTranscriber::from_env().is_ok());
        std::env::remove_var(CREDENTIAL_ENV);
    }
}
