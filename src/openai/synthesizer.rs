//! Text-to-speech through the chat completions audio modality.
//!
//! Each line is sent with the speaker's voice and acting notes; the base64
//! reply is decoded and written to a file reserved in the [`AssetStore`].

use crate::audio::{AssetStore, AudioAsset, SynthesisRequest, Synthesizer};
use crate::config::SynthesisConfig;
use crate::error::{DioramaError, Result};
use crate::openai::{AudioOptions, ChatMessage, ChatRequest, OpenAiClient};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

/// Voices lines with an audio-capable chat model and stores them as files.
pub struct OpenAiSynthesizer {
    client: OpenAiClient,
    store: AssetStore,
    model: String,
    format: String,
}

impl OpenAiSynthesizer {
    pub fn new(client: OpenAiClient, store: AssetStore, config: &SynthesisConfig) -> Self {
        Self {
            client,
            store,
            model: config.model.clone(),
            format: config.format.clone(),
        }
    }

    fn build_request(&self, request: &SynthesisRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(actor_prompt(&request.voice.style)),
                ChatMessage::user(request.text.clone()),
            ],
            max_tokens: None,
            modalities: Some(vec!["text", "audio"]),
            audio: Some(AudioOptions {
                voice: request.voice.voice.clone(),
                format: self.format.clone(),
            }),
        }
    }
}

/// Instructions for reading one line verbatim in character.
fn actor_prompt(style: &str) -> String {
    [
        "You are a caricature voice actor.",
        &format!("Your role: {}", style.trim()),
        "Read the user's line exactly as written. Do not answer it, do not normalize it.",
        "Speak immediately, with high energy.",
    ]
    .join("\n")
}

fn decode_audio(data: &str) -> Result<Vec<u8>> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| DioramaError::Synthesis {
            message: format!("invalid base64 audio: {e}"),
        })?;
    if bytes.is_empty() {
        return Err(DioramaError::Synthesis {
            message: "empty audio payload".to_string(),
        });
    }
    Ok(bytes)
}

/// Writes `bytes` to the asset's file on the blocking pool.
///
/// The asset travels with the write, so if the caller is aborted mid-write the
/// guard is dropped after the file exists and removes it.
async fn write_asset(asset: AudioAsset, bytes: Vec<u8>) -> Result<AudioAsset> {
    tokio::task::spawn_blocking(move || -> Result<AudioAsset> {
        if let Some(path) = asset.path() {
            std::fs::write(path, &bytes)?;
        }
        Ok(asset)
    })
    .await
    .map_err(|e| DioramaError::Synthesis {
        message: format!("audio write task failed: {e}"),
    })?
}

#[async_trait::async_trait]
impl Synthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioAsset> {
        // Owned before the request so an abort at any await leaves no file.
        let asset = self.store.reserve(request.epoch, request.sequence_index);
        if asset.path().is_none() {
            return Err(DioramaError::Synthesis {
                message: "asset store returned an in-memory asset".to_string(),
            });
        }

        debug!(
            epoch = request.epoch,
            index = request.sequence_index,
            voice = %request.voice.voice,
            "Requesting speech"
        );
        let response = self
            .client
            .chat(&self.build_request(request))
            .await
            .map_err(|message| DioramaError::Synthesis { message })?;

        let audio = response
            .first_message()
            .and_then(|message| message.audio)
            .ok_or_else(|| DioramaError::Synthesis {
                message: "response contained no audio".to_string(),
            })?;
        let bytes = decode_audio(&audio.data)?;

        write_asset(asset, bytes).await
    }

    fn name(&self) -> &str {
        &self.model
    }
}
