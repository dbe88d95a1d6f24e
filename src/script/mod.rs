//! Script generation: the writer trait, prompt assembly and script parsing.

pub mod parse;
pub mod prompt;

pub use parse::{Utterance, clean_speaker, parse_script};

use crate::error::{DioramaError, Result};
use crate::scene::{GenerationMode, SceneRequest};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Writes a `Speaker: line` script for a scene.
///
/// Must cope with one to many participants, and with `prior_context` when the
/// mode is an interruption.
#[async_trait::async_trait]
pub trait ScriptGenerator: Send + Sync {
    /// Generate the raw script text.
    async fn generate(&self, request: &SceneRequest) -> Result<String>;

    /// Name for logging.
    fn name(&self) -> &str {
        "generator"
    }
}

/// Scripted generator for tests and offline runs.
///
/// Clones share the recorded calls, so a test can keep one copy and hand the
/// other to the pipeline.
#[derive(Debug, Clone)]
pub struct MockGenerator {
    scripts: Vec<String>,
    delay: Duration,
    should_fail: bool,
    calls: Arc<Mutex<Vec<SceneRequest>>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            scripts: vec!["Host: Hello.".to_string()],
            delay: Duration::ZERO,
            should_fail: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answer with this script.
    pub fn with_script(mut self, script: &str) -> Self {
        self.scripts = vec![script.to_string()];
        self
    }

    /// Answer the n-th call with the n-th script; the last one repeats.
    pub fn with_scripts(mut self, scripts: &[&str]) -> Self {
        self.scripts = scripts.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Simulated service latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Requests received so far, in call order.
    pub fn calls(&self) -> Vec<SceneRequest> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ScriptGenerator for MockGenerator {
    async fn generate(&self, request: &SceneRequest) -> Result<String> {
        let call_index = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            calls.push(request.clone());
            calls.len() - 1
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.should_fail {
            return Err(DioramaError::Generation {
                message: "mock generation failure".to_string(),
            });
        }

        let script = self
            .scripts
            .get(call_index)
            .or_else(|| self.scripts.last())
            .cloned()
            .unwrap_or_default();
        Ok(script)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Offline generator that needs no network: the station greets everyone and
/// each guest answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedGenerator;

impl CannedGenerator {
    pub fn script_for(request: &SceneRequest) -> String {
        let host = request.station.as_str();
        let opening = match &request.mode {
            GenerationMode::Fresh => {
                let guests: Vec<&str> = request.participants.iter().map(|p| p.as_str()).collect();
                format!("{host}: Welcome, {}.", guests.join(" and "))
            }
            GenerationMode::Interruption { newcomer, .. } => {
                format!("{host}: Wait, {newcomer} just arrived!")
            }
        };

        let mut lines = vec![opening];
        lines.extend(
            request
                .participants
                .iter()
                .map(|guest| format!("{guest}: Hello, {host}.")),
        );
        lines.join("\n")
    }
}

#[async_trait::async_trait]
impl ScriptGenerator for CannedGenerator {
    async fn generate(&self, request: &SceneRequest) -> Result<String> {
        Ok(Self::script_for(request))
    }

    fn name(&self) -> &str {
        "canned"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Participant, Station};

    fn request() -> SceneRequest {
        SceneRequest {
            station: Station::new("Desk"),
            participants: vec![Participant::new("Book")],
            mode: GenerationMode::Fresh,
        }
    }

    #[tokio::test]
    async fn mock_returns_scripts_in_order_then_repeats_last() {
        let generator = MockGenerator::new().with_scripts(&["Desk: one", "Desk: two"]);
        assert_eq!(generator.generate(&request()).await.unwrap(), "Desk: one");
        assert_eq!(generator.generate(&request()).await.unwrap(), "Desk: two");
        assert_eq!(generator.generate(&request()).await.unwrap(), "Desk: two");
    }

    #[tokio::test]
    async fn mock_records_calls_across_clones() {
        let generator = MockGenerator::new();
        let shared: Arc<dyn ScriptGenerator> = Arc::new(generator.clone());
        shared.generate(&request()).await.unwrap();
        assert_eq!(generator.calls(), vec![request()]);
    }

    #[tokio::test]
    async fn mock_failure_is_a_generation_error() {
        let generator = MockGenerator::new().with_failure();
        match generator.generate(&request()).await {
            Err(DioramaError::Generation { message }) => {
                assert_eq!(message, "mock generation failure")
            }
            other => panic!("Expected Generation error, got {:?}", other),
        }
        // The failed call is still recorded
        assert_eq!(generator.calls().len(), 1);
    }

    #[tokio::test]
    async fn canned_fresh_scene_greets_everyone() {
        let request = SceneRequest {
            station: Station::new("Desk"),
            participants: vec![Participant::new("Book"), Participant::new("Bag")],
            mode: GenerationMode::Fresh,
        };
        let script = CannedGenerator.generate(&request).await.unwrap();
        assert_eq!(
            script,
            "Desk: Welcome, Book and Bag.\nBook: Hello, Desk.\nBag: Hello, Desk."
        );
        assert_eq!(parse_script(&script).len(), 3);
    }

    #[test]
    fn canned_interruption_names_the_newcomer() {
        let request = SceneRequest {
            station: Station::new("Desk"),
            participants: vec![Participant::new("Book"), Participant::new("Monitor")],
            mode: GenerationMode::Interruption {
                newcomer: Participant::new("Monitor"),
                prior_context: Some("Book: Hi.".to_string()),
            },
        };
        let script = CannedGenerator::script_for(&request);
        assert!(script.starts_with("Desk: Wait, Monitor just arrived!"));
    }
}
