//! Error types for diorama.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DioramaError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Event source errors
    #[error("Event source unavailable at {path}: {message}")]
    EventSource { path: String, message: String },

    // Collaborator errors
    #[error("Script generation failed: {message}")]
    Generation { message: String },

    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    #[error("Audio player not found: {program}")]
    PlayerNotFound { program: String },

    #[error("Audio playback failed: {message}")]
    Playback { message: String },

    // Orchestration errors
    #[error("Session orchestrator is not running")]
    OrchestratorStopped,

    // IPC errors
    #[error("IPC socket error: {message}")]
    IpcSocket { message: String },

    #[error("IPC protocol error: {message}")]
    IpcProtocol { message: String },

    #[error("IPC connection failed: {message}")]
    IpcConnection { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DioramaError>;
