use crate::cast::Cast;
use crate::defaults;
use crate::error::{DioramaError, Result};
use crate::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub session: SessionSettings,
    pub source: SourceConfig,
    pub generation: GenerationConfig,
    pub synthesis: SynthesisConfig,
    pub playback: PlaybackConfig,
    pub cast: Cast,
}

/// Session deadlines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    pub buffer_ms: u64,
    pub window_ms: u64,
}

/// Where reader lines come from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    /// Serial device path; stdin when unset.
    pub serial_port: Option<PathBuf>,
    pub baud_rate: u32,
}

/// Script writer settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
    /// Only ever read from the environment; never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

/// Speech synthesis settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    pub model: String,
    pub format: String,
    /// Directory for audio files; system temp dir when unset.
    pub asset_dir: Option<PathBuf>,
}

/// Audio output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Player program followed by its arguments; the asset path is appended.
    pub command: Vec<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            buffer_ms: defaults::BUFFER_WINDOW_MS,
            window_ms: defaults::SESSION_WINDOW_MS,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            serial_port: None,
            baud_rate: defaults::BAUD_RATE,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: defaults::GENERATION_MODEL.to_string(),
            max_tokens: defaults::GENERATION_MAX_TOKENS,
            base_url: defaults::API_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            model: defaults::SYNTHESIS_MODEL.to_string(),
            format: defaults::AUDIO_FORMAT.to_string(),
            asset_dir: None,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            command: defaults::player_command(),
        }
    }
}

impl SessionSettings {
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            buffer: Duration::from_millis(self.buffer_ms),
            window: Duration::from_millis(self.window_ms),
        }
    }
}

impl SynthesisConfig {
    pub fn asset_dir(&self) -> PathBuf {
        self.asset_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, or defaults if the file doesn't exist.
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - OPENAI_API_KEY → generation.api_key
    /// - DIORAMA_SERIAL_PORT → source.serial_port
    /// - DIORAMA_GENERATION_MODEL → generation.model
    /// - DIORAMA_SYNTHESIS_MODEL → synthesis.model
    /// - DIORAMA_PLAYER → playback.command (whitespace separated)
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(key) = non_empty_env("OPENAI_API_KEY") {
            self.generation.api_key = Some(key);
        }

        if let Some(port) = non_empty_env("DIORAMA_SERIAL_PORT") {
            self.source.serial_port = Some(PathBuf::from(port));
        }

        if let Some(model) = non_empty_env("DIORAMA_GENERATION_MODEL") {
            self.generation.model = model;
        }

        if let Some(model) = non_empty_env("DIORAMA_SYNTHESIS_MODEL") {
            self.synthesis.model = model;
        }

        if let Some(player) = non_empty_env("DIORAMA_PLAYER") {
            self.playback.command = player.split_whitespace().map(str::to_string).collect();
        }

        self
    }

    /// Rejects settings the orchestrator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.session.buffer_ms == 0 {
            return Err(invalid("session.buffer_ms", "must be greater than zero"));
        }
        if self.session.window_ms == 0 {
            return Err(invalid("session.window_ms", "must be greater than zero"));
        }
        if self.session.buffer_ms >= self.session.window_ms {
            return Err(invalid(
                "session.buffer_ms",
                "must be shorter than session.window_ms",
            ));
        }
        if self.playback.command.first().is_none_or(|p| p.trim().is_empty()) {
            return Err(invalid("playback.command", "must name a player program"));
        }
        if self.generation.max_tokens == 0 {
            return Err(invalid("generation.max_tokens", "must be greater than zero"));
        }
        if self.cast.stations.is_empty() {
            return Err(invalid("cast.stations", "at least one station is required"));
        }
        Ok(())
    }

    /// Effective configuration as TOML (the API key is never included).
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DioramaError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/diorama/config.toml on Linux
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| DioramaError::ConfigFileNotFound {
            path: "<no config directory>".to_string(),
        })?;
        Ok(dir.join("diorama").join("config.toml"))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn invalid(key: &str, message: &str) -> DioramaError {
    DioramaError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
