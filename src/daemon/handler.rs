//! Command handler implementation for the daemon.

use crate::cast::Cast;
use crate::error::DioramaError;
use crate::event::{PresenceEvent, ReaderEvent};
use crate::ipc::protocol::{Command, Response};
use crate::ipc::server::CommandHandler;
use crate::scene::{Participant, Station};
use crate::session::OrchestratorHandle;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Routes IPC commands to the session orchestrator.
pub struct DaemonCommandHandler {
    handle: OrchestratorHandle,
    cast: Arc<Cast>,
    shutdown: CancellationToken,
}

impl DaemonCommandHandler {
    pub fn new(handle: OrchestratorHandle, cast: Arc<Cast>, shutdown: CancellationToken) -> Self {
        Self {
            handle,
            cast,
            shutdown,
        }
    }

    async fn apply(&self, event: PresenceEvent) -> Response {
        info!(station = %event.station, participant = %event.participant, "Event via IPC");
        match self.handle.event(event).await {
            Ok(action) => Response::Action { action },
            Err(e) => failure(e),
        }
    }

    async fn reading(&self, reader: String, tag: String) -> Response {
        let reading = ReaderEvent {
            reader_id: reader.trim().to_string(),
            tag_uid: tag.trim().to_ascii_uppercase(),
        };
        match self.cast.resolve(&reading) {
            Some(event) => self.apply(event).await,
            None => Response::error(format!(
                "Unknown reader '{}' or tag '{}'",
                reading.reader_id, reading.tag_uid
            )),
        }
    }
}

fn failure(e: DioramaError) -> Response {
    Response::error(e.to_string())
}

#[async_trait::async_trait]
impl CommandHandler for DaemonCommandHandler {
    async fn handle(&self, command: Command) -> Response {
        match command {
            Command::Event {
                station,
                participant,
            } => {
                if station.trim().is_empty() || participant.trim().is_empty() {
                    return Response::error("station and participant must not be empty");
                }
                self.apply(PresenceEvent {
                    station: Station::new(station.trim()),
                    participant: Participant::new(participant.trim()),
                })
                .await
            }
            Command::Reading { reader, tag } => self.reading(reader, tag).await,
            Command::Reset => match self.handle.reset().await {
                Ok(()) => Response::Ok,
                Err(e) => failure(e),
            },
            Command::Status => match self.handle.status().await {
                Ok(snapshot) => Response::from(snapshot),
                Err(e) => failure(e),
            },
            Command::Shutdown => {
                info!("Shutdown requested via IPC");
                self.shutdown.cancel();
                Response::Ok
            }
        }
    }
}
