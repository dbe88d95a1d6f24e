//! diorama - spoken multi-character scenes for RFID installations
//!
//! Objects tagged with RFID chips are placed on reader stations; each station
//! and object is a character. Presence events open a session, a short buffer
//! window gathers the cast, and a script is written, voiced and played line by
//! line. Newcomers interrupt the scene while it is live.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod cast;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod daemon;
pub mod defaults;
#[cfg(feature = "cli")]
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod input;
pub mod ipc;
pub mod logging;
#[cfg(feature = "openai")]
pub mod openai;
pub mod output;
pub mod pipeline;
pub mod scene;
pub mod script;
pub mod session;
mod sys;

// L4 composition root - needs everything
#[cfg(feature = "cli")]
pub mod app;

// Core traits (writer → voice → speaker)
pub use audio::{AudioSink, Synthesizer};
pub use script::ScriptGenerator;

// Test doubles and offline backends
pub use audio::{MockSynthesizer, RecordingSink};
pub use script::{CannedGenerator, MockGenerator};

// Pipeline and session
pub use pipeline::{Pipeline, PipelineEvent, RunOutcome, RunReport};
pub use session::{Action, OrchestratorHandle, SessionConfig, SessionSnapshot};

// Domain types
pub use cast::{Cast, Character, VoiceProfile};
pub use event::{PresenceEvent, ReaderEvent};
pub use scene::{GenerationMode, Participant, SceneRequest, Station};

// Error handling
pub use error::{DioramaError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
