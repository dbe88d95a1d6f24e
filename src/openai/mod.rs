//! OpenAI chat-completions backends for script writing and speech.

pub mod generator;
pub mod synthesizer;

pub use generator::OpenAiGenerator;
pub use synthesizer::OpenAiSynthesizer;

use crate::config::GenerationConfig;
use crate::error::{DioramaError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub(crate) struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub(crate) struct AudioOptions {
    pub voice: String,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioOptions>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub audio: Option<ResponseAudio>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponseAudio {
    pub data: String,
}

impl ChatResponse {
    pub fn first_message(self) -> Option<ResponseMessage> {
        self.choices.into_iter().next().map(|choice| choice.message)
    }
}

/// Thin authenticated client for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(DioramaError::ConfigInvalidValue {
                key: "OPENAI_API_KEY".to_string(),
                message: "is not set".to_string(),
            });
        }
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }

    /// Client from the `[generation]` settings; the synthesizer shares it.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Self::new(&config.base_url, config.api_key.as_deref().unwrap_or_default())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one chat request. Errors are plain messages; callers pick the
    /// error variant.
    pub(crate) async fn chat(&self, request: &ChatRequest) -> std::result::Result<ChatResponse, String> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| format!("request to {} failed: {e}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API returned status {status}: {}", body.trim()));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| format!("failed to parse API response: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_config_error() {
        assert!(matches!(
            OpenAiClient::new("https://api.openai.com/v1", " "),
            Err(DioramaError::ConfigInvalidValue { .. })
        ));
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = OpenAiClient::new("http://localhost:8080/v1/", "sk").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn text_request_omits_audio_fields() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage::user("hi")],
            max_tokens: Some(150),
            modalities: None,
            audio: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 150);
        assert!(json.get("audio").is_none());
        assert!(json.get("modalities").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn response_parses_text_and_audio() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":null,"audio":{"id":"a","data":"AAAA","transcript":"hi"}}}]}"#;
        let message = serde_json::from_str::<ChatResponse>(json)
            .unwrap()
            .first_message()
            .unwrap();
        assert!(message.content.is_none());
        assert_eq!(message.audio.unwrap().data, "AAAA");
    }
}
