//! Scene scripts from a chat model, prompted with the cast and the scene.

use crate::cast::Cast;
use crate::config::GenerationConfig;
use crate::error::{DioramaError, Result};
use crate::openai::{ChatMessage, ChatRequest, OpenAiClient};
use crate::scene::SceneRequest;
use crate::script::ScriptGenerator;
use crate::script::prompt::{system_prompt, user_message};
use std::sync::Arc;
use tracing::debug;

/// Writes scene scripts with a chat model.
pub struct OpenAiGenerator {
    client: OpenAiClient,
    cast: Arc<Cast>,
    model: String,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn new(client: OpenAiClient, cast: Arc<Cast>, config: &GenerationConfig) -> Self {
        Self {
            client,
            cast,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    fn build_request(&self, request: &SceneRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(system_prompt(&self.cast, request)),
                ChatMessage::user(user_message(request)),
            ],
            max_tokens: Some(self.max_tokens),
            modalities: None,
            audio: None,
        }
    }
}

#[async_trait::async_trait]
impl ScriptGenerator for OpenAiGenerator {
    async fn generate(&self, request: &SceneRequest) -> Result<String> {
        let body = self.build_request(request);
        debug!(model = %self.model, mode = request.mode.label(), "Requesting script");

        let response = self
            .client
            .chat(&body)
            .await
            .map_err(|message| DioramaError::Generation { message })?;

        response
            .first_message()
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| DioramaError::Generation {
                message: "response contained no script".to_string(),
            })
    }

    fn name(&self) -> &str {
        &self.model
    }
}
