//! Text-to-speech seam: one request per utterance, no ordering promised.

use crate::audio::asset::AudioAsset;
use crate::cast::VoiceProfile;
use crate::error::{DioramaError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// What to voice, tagged with the run and position it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub epoch: u64,
    pub sequence_index: usize,
    pub speaker: String,
    pub text: String,
    pub voice: VoiceProfile,
}

/// Turns one line of dialogue into an audio asset.
#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioAsset>;

    /// Name for logging.
    fn name(&self) -> &str {
        "synthesizer"
    }
}

/// In-memory synthesizer for tests and offline runs.
///
/// Produces assets whose bytes are `"Speaker: text"`, with configurable
/// latency and failures per sequence index.
#[derive(Debug, Clone, Default)]
pub struct MockSynthesizer {
    delay: Duration,
    index_delays: HashMap<usize, Duration>,
    failing: HashSet<usize>,
    requests: Arc<Mutex<Vec<SynthesisRequest>>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latency for every request without a specific delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Latency for one sequence index.
    pub fn with_index_delay(mut self, index: usize, delay: Duration) -> Self {
        self.index_delays.insert(index, delay);
        self
    }

    /// Fail every request for this sequence index.
    pub fn with_failure_at(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioAsset> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let delay = self
            .index_delays
            .get(&request.sequence_index)
            .copied()
            .unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(&request.sequence_index) {
            return Err(DioramaError::Synthesis {
                message: format!("mock synthesis failure at {}", request.sequence_index),
            });
        }

        Ok(AudioAsset::in_memory(
            request.epoch,
            request.sequence_index,
            format!("{}: {}", request.speaker, request.text).into_bytes(),
        ))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
