//! Composition root: wires config into a pipeline and drives the keyboard
//! harness.

use crate::audio::{MockSynthesizer, RecordingSink};
use crate::cast::Cast;
use crate::config::Config;
use crate::error::{DioramaError, Result};
use crate::input::{HarnessCommand, LineReader, key_help, parse_command};
use crate::output;
use crate::pipeline::Pipeline;
use crate::script::CannedGenerator;
use crate::session::{self, OrchestratorHandle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// How long each line "plays" in a dry run.
const DRY_RUN_LINE: Duration = Duration::from_millis(1500);

/// Builds the generation/synthesis/playback pipeline described by `config`.
///
/// A dry run uses the canned writer, in-memory "audio" and a sink that only
/// logs each line, so nothing touches the network or the speakers.
pub fn build_pipeline(config: &Config, dry_run: bool) -> Result<Pipeline> {
    let cast = Arc::new(config.cast.clone());
    if dry_run {
        info!("Dry run: canned scripts, no synthesis, no audio");
        return Ok(Pipeline::new(
            Arc::new(CannedGenerator),
            Arc::new(MockSynthesizer::new()),
            Arc::new(RecordingSink::new(DRY_RUN_LINE)),
            cast,
        ));
    }
    live_pipeline(config, cast)
}

#[cfg(feature = "openai")]
fn live_pipeline(config: &Config, cast: Arc<Cast>) -> Result<Pipeline> {
    use crate::audio::{AssetStore, CommandPlayer};
    use crate::openai::{OpenAiClient, OpenAiGenerator, OpenAiSynthesizer};

    let client = OpenAiClient::from_config(&config.generation)?;
    let store = AssetStore::new(config.synthesis.asset_dir(), &config.synthesis.format);
    match store.sweep() {
        Ok(0) => {}
        Ok(removed) => info!(removed, dir = %store.dir().display(), "Removed stale audio files"),
        Err(e) => warn!(error = %e, "Could not sweep the asset directory"),
    }

    let player = CommandPlayer::from_command(&config.playback.command, store.clone())?;
    tracing::debug!(
        endpoint = client.endpoint(),
        player = player.program(),
        "Live pipeline configured"
    );

    Ok(Pipeline::new(
        Arc::new(OpenAiGenerator::new(
            client.clone(),
            Arc::clone(&cast),
            &config.generation,
        )),
        Arc::new(OpenAiSynthesizer::new(client, store, &config.synthesis)),
        Arc::new(player),
        cast,
    ))
}

#[cfg(not(feature = "openai"))]
fn live_pipeline(_config: &Config, _cast: Arc<Cast>) -> Result<Pipeline> {
    Err(DioramaError::Other(
        "built without the `openai` feature; use --dry-run".to_string(),
    ))
}

/// Runs the keyboard harness on stdin until `q`, EOF or Ctrl+C.
pub async fn run_simulation(config: Config, dry_run: bool, color: bool) -> Result<()> {
    let cast = config.cast.clone();
    let pipeline = build_pipeline(&config, dry_run)?;
    let (handle, task) = session::spawn(pipeline, config.session.to_session_config());

    println!("{}", key_help());
    let mut lines = LineReader::stdin()?;
    let mut ctrl_c = std::pin::pin!(tokio::signal::ctrl_c());
    let result = loop {
        let line = tokio::select! {
            _ = &mut ctrl_c => break Ok(()),
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(DioramaError::Io(e)),
        };

        match parse_command(&line, &cast) {
            Ok(None) => {}
            Ok(Some(HarnessCommand::Quit)) => break Ok(()),
            Ok(Some(command)) => {
                if let Err(e) = apply(command, &cast, &handle, color).await {
                    break Err(e);
                }
            }
            Err(message) => eprintln!("{message}"),
        }
    };

    handle.shutdown().await?;
    if let Err(e) = task.await {
        warn!(error = %e, "Orchestrator task failed");
    }
    result
}

async fn apply(
    command: HarnessCommand,
    cast: &Cast,
    handle: &OrchestratorHandle,
    color: bool,
) -> Result<()> {
    match command {
        HarnessCommand::Reading(reading) => match cast.resolve(&reading) {
            Some(event) => {
                println!("{} at {}", event.participant, event.station);
                let action = handle.event(event).await?;
                println!("{}", output::render_action(action, color));
            }
            None => eprintln!(
                "Unknown reader '{}' or tag '{}'",
                reading.reader_id, reading.tag_uid
            ),
        },
        HarnessCommand::Presence(event) => {
            let action = handle.event(event).await?;
            println!("{}", output::render_action(action, color));
        }
        HarnessCommand::Reset => {
            handle.reset().await?;
            println!("Session reset");
        }
        HarnessCommand::Status => {
            println!("{}", output::render_snapshot(&handle.status().await?));
        }
        HarnessCommand::Help => println!("{}", key_help()),
        HarnessCommand::Quit => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ReaderEvent;
    use crate::session::{Action, SessionConfig};

    #[tokio::test(start_paused = true)]
    async fn dry_run_pipeline_needs_no_api_key() {
        let mut config = Config::default();
        config.generation.api_key = None;
        let pipeline = build_pipeline(&config, true).unwrap();
        assert!(!pipeline.is_playing());
    }

    #[cfg(feature = "openai")]
    #[test]
    fn live_pipeline_requires_api_key() {
        let mut config = Config::default();
        config.generation.api_key = None;
        assert!(build_pipeline(&config, false).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn harness_commands_drive_the_session() {
        let config = Config::default();
        let cast = config.cast.clone();
        let pipeline = build_pipeline(&config, true).unwrap();
        let (handle, task) = session::spawn(pipeline, SessionConfig::default());

        let reading = HarnessCommand::Reading(ReaderEvent {
            reader_id: "3".to_string(),
            tag_uid: "53 B5 11 60 21 00 01".to_string(),
        });
        apply(reading, &cast, &handle, false).await.unwrap();
        let status = handle.status().await.unwrap();
        assert_eq!(status.station.as_deref(), Some("Desk"));
        assert_eq!(status.participants, vec!["Book".to_string()]);

        apply(HarnessCommand::Reset, &cast, &handle, false)
            .await
            .unwrap();
        assert!(handle.status().await.unwrap().station.is_none());

        let action = handle
            .event(crate::event::PresenceEvent {
                station: crate::scene::Station::new("Desk"),
                participant: crate::scene::Participant::new("Bag"),
            })
            .await
            .unwrap();
        assert_eq!(action, Action::StartSession);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }
}
