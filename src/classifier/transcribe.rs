//! Transcription service client.
//!
//! The service is a black box: audio bytes in, text out. Responses arrive
//! either as plain text or as JSON (`text` field or `segments` array),
//! depending on the deployment; both are accepted.

use base64::Engine;
use serde::Serialize;

use super::AnalysisError;

/// Canned transcript returned in sandbox mode. Contains no distress
/// keywords, so sandbox audio classifies as NONE.
const SANDBOX_TRANSCRIPT: &str = "[sandbox transcription]";

#[derive(Serialize)]
struct TranscribeRequest {
    audio_b64: String,
}

/// HTTP client for the transcription service.
pub struct TranscriptionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    test_mode: bool,
}

impl TranscriptionClient {
    pub fn new(endpoint: &str, api_key: &str, test_mode: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            test_mode,
        }
    }

    /// Transcribe raw audio bytes to text.
    ///
    /// An empty string is a valid outcome (silence, unintelligible audio);
    /// callers treat it as "no distress keywords found".
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String, AnalysisError> {
        if self.test_mode || self.api_key.is_empty() {
            tracing::debug!("Sandbox mode: simulating transcription");
            return Ok(SANDBOX_TRANSCRIPT.to_string());
        }

        let body = TranscribeRequest {
            audio_b64: base64::engine::general_purpose::STANDARD.encode(audio),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::UpstreamStatus {
                service: "transcription",
                status: status.as_u16(),
                body,
            });
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);
        let text = response.text().await?;

        if is_json {
            Ok(extract_transcript(&text))
        } else {
            Ok(text.trim().to_string())
        }
    }
}

/// Pull transcript text out of a JSON response body.
/// Unknown shapes degrade to the raw body rather than failing.
fn extract_transcript(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    if let Some(text) = value.get("text").and_then(|t| t.as_str()) {
        return text.trim().to_string();
    }

    if let Some(segments) = value.get("segments").and_then(|s| s.as_array()) {
        let joined: Vec<&str> = segments
            .iter()
            .filter_map(|seg| seg.get("text").and_then(|t| t.as_str()))
            .map(str::trim)
            .collect();
        return joined.join(" ");
    }

    body.trim().to_string()
}
