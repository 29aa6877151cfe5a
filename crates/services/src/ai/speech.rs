use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use super::client::AiClient;
use crate::error::AiError;

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: String,
    response_format: &'static str,
}

pub(crate) fn narration_input(text: &str) -> String {
    format!(
        "Narrate the following text clearly and engagingly for a student preparing for an exam: {}",
        text.trim()
    )
}

impl AiClient {
    /// Synthesize narration for `text`; returns base64-encoded MP3 audio.
    ///
    /// # Errors
    ///
    /// Returns `AiError` when the gateway is disabled, the request fails,
    /// or no audio comes back.
    pub async fn narrate(&self, text: &str) -> Result<String, AiError> {
        let config = self.config()?;
        let payload = SpeechRequest {
            model: &config.speech_model,
            voice: &config.voice,
            input: narration_input(text),
            response_format: "mp3",
        };

        let response = self
            .client
            .post(config.endpoint("audio/speech"))
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiError::HttpStatus(response.status()));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(AiError::EmptyResponse);
        }
        tracing::debug!(bytes = audio.len(), "narration synthesized");
        Ok(STANDARD.encode(&audio))
    }
}
