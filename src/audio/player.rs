//! Plays assets through an external command-line player (`afplay`, `mpg123`, ...).

use crate::audio::asset::{AssetData, AudioAsset, AssetStore};
use crate::audio::sink::{AudioSink, PlaybackOutcome};
use crate::error::{DioramaError, Result};
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Sink that runs `program args... <file>` once per asset.
///
/// In-memory assets are written to a scratch file first. Stopping kills the
/// child; it is also killed if the play future is dropped.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    scratch: AssetStore,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>, scratch: AssetStore) -> Self {
        Self {
            program: program.into(),
            args,
            scratch,
        }
    }

    /// Builds a player from a full command line, e.g. `["mpg123", "-q"]`.
    pub fn from_command(command: &[String], scratch: AssetStore) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| DioramaError::ConfigInvalidValue {
                key: "playback.command".to_string(),
                message: "must name a program".to_string(),
            })?;
        Ok(Self::new(program.clone(), args.to_vec(), scratch))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn play_file(&self, path: &Path, stop: &CancellationToken) -> Result<PlaybackOutcome> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => DioramaError::PlayerNotFound {
                    program: self.program.clone(),
                },
                _ => DioramaError::Playback {
                    message: format!("failed to start {}: {e}", self.program),
                },
            })?;

        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                if let Err(e) = child.kill().await {
                    // Already exited between the check and the kill.
                    debug!(error = %e, "player kill failed");
                }
                Ok(PlaybackOutcome::Killed)
            }
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    Ok(PlaybackOutcome::Finished)
                } else {
                    Err(DioramaError::Playback {
                        message: format!("{} exited with {status}", self.program),
                    })
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl AudioSink for CommandPlayer {
    async fn play(&self, asset: &AudioAsset, stop: CancellationToken) -> Result<PlaybackOutcome> {
        if stop.is_cancelled() {
            return Ok(PlaybackOutcome::Killed);
        }
        match asset.data() {
            AssetData::File(path) => self.play_file(path, &stop).await,
            AssetData::Memory(bytes) => {
                let scratch = self.scratch.reserve(asset.epoch(), asset.index());
                let Some(path) = scratch.path() else {
                    return Err(DioramaError::Playback {
                        message: "scratch asset has no path".to_string(),
                    });
                };
                tokio::fs::write(path, bytes).await?;
                let outcome = self.play_file(path, &stop).await;
                if let Err(e) = scratch.release() {
                    warn!(error = %e, "failed to delete scratch audio file");
                }
                outcome
            }
        }
    }

    fn name(&self) -> &'static str {
        "command"
    }
}
