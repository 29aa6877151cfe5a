use std::env;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AiError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SPEECH_MODEL: &str = "gpt-4o-mini-tts";
pub const DEFAULT_VOICE: &str = "alloy";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Clone, Debug)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub speech_model: String,
    pub voice: String,
    pub timeout: Duration,
}

impl AiConfig {
    /// Read `EXAM_AI_*` variables. Returns `None` when no API key is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`AiConfig::from_env`] with an injectable variable source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let api_key = lookup("EXAM_AI_API_KEY")?;
        if api_key.trim().is_empty() {
            return None;
        }
        let timeout_secs = lookup("EXAM_AI_TIMEOUT_SECS")
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Some(Self {
            base_url: lookup("EXAM_AI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            api_key,
            model: lookup("EXAM_AI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            speech_model: lookup("EXAM_AI_SPEECH_MODEL")
                .unwrap_or_else(|| DEFAULT_SPEECH_MODEL.into()),
            voice: lookup("EXAM_AI_VOICE").unwrap_or_else(|| DEFAULT_VOICE.into()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

/// Stateless gateway to the generative AI service.
///
/// Every call is a single request/response; nothing is cached or retried.
#[derive(Clone)]
pub struct AiClient {
    pub(crate) client: Client,
    pub(crate) config: Option<AiConfig>,
}

impl AiClient {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(AiConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<AiConfig>) -> Self {
        let timeout = config
            .as_ref()
            .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), |c| c.timeout);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    pub(crate) fn config(&self) -> Result<&AiConfig, AiError> {
        self.config.as_ref().ok_or(AiError::Disabled)
    }

    /// Generate free text from a prompt.
    ///
    /// # Errors
    ///
    /// Returns `AiError` when the gateway is disabled, the request fails,
    /// or the response is empty.
    pub async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        self.chat(prompt, None, 0.2).await
    }

    /// Generate a JSON document from a prompt using the provider's JSON mode.
    ///
    /// # Errors
    ///
    /// Returns `AiError` when the gateway is disabled, the request fails,
    /// or the response is empty.
    pub async fn generate_json(&self, prompt: &str) -> Result<String, AiError> {
        self.chat(
            prompt,
            Some(ResponseFormat {
                kind: "json_object",
            }),
            0.0,
        )
        .await
    }

    async fn chat(
        &self,
        prompt: &str,
        response_format: Option<ResponseFormat>,
        temperature: f32,
    ) -> Result<String, AiError> {
        let config = self.config()?;
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature,
            response_format,
        };

        let response = self
            .client
            .post(config.endpoint("chat/completions"))
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(AiError::EmptyResponse)?;

        Ok(content.trim().to_string())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
