//! Actor task that owns the [`SessionDirector`].
//!
//! Presence events, control commands, deadline firings and pipeline progress
//! all arrive as messages and are applied one at a time, so the session has a
//! single writer without any locking.

use crate::defaults;
use crate::error::{DioramaError, Result};
use crate::event::PresenceEvent;
use crate::pipeline::Pipeline;
use crate::session::Action;
use crate::session::director::{SessionDirector, SessionSnapshot};
use crate::session::timers::SessionTimers;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const COMMAND_BUFFER: usize = 64;

/// Deadline lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub buffer: Duration,
    pub window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer: Duration::from_millis(defaults::BUFFER_WINDOW_MS),
            window: Duration::from_millis(defaults::SESSION_WINDOW_MS),
        }
    }
}

#[derive(Debug)]
enum SessionCommand {
    Event {
        event: PresenceEvent,
        reply: oneshot::Sender<Action>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown,
}

/// Cloneable front door to a running orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl OrchestratorHandle {
    /// Applies a presence event and returns what it did.
    pub async fn event(&self, event: PresenceEvent) -> Result<Action> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Event { event, reply }).await?;
        rx.await.map_err(|_| DioramaError::OrchestratorStopped)
    }

    /// Stops audio and clears the session.
    pub async fn reset(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Reset { reply }).await?;
        rx.await.map_err(|_| DioramaError::OrchestratorStopped)
    }

    pub async fn status(&self) -> Result<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Status { reply }).await?;
        rx.await.map_err(|_| DioramaError::OrchestratorStopped)
    }

    /// Asks the orchestrator to reset and exit. Succeeds if it already has.
    pub async fn shutdown(&self) -> Result<()> {
        match self.send(SessionCommand::Shutdown).await {
            Ok(()) | Err(DioramaError::OrchestratorStopped) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| DioramaError::OrchestratorStopped)
    }
}

/// Starts the orchestrator task for `pipeline`.
///
/// The task exits on [`OrchestratorHandle::shutdown`] or once every handle is
/// dropped, resetting the session on the way out.
pub fn spawn(pipeline: Pipeline, config: SessionConfig) -> (OrchestratorHandle, JoinHandle<()>) {
    let (pipeline_tx, pipeline_rx) = mpsc::unbounded_channel();
    let (fired_tx, fired_rx) = mpsc::unbounded_channel();
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);

    let timers = SessionTimers::new(config.buffer, config.window, fired_tx);
    let director = SessionDirector::new(pipeline.with_events(pipeline_tx), timers);
    info!(
        buffer = ?config.buffer,
        window = ?config.window,
        "Session orchestrator started"
    );

    let task = tokio::spawn(run(director, rx, fired_rx, pipeline_rx));
    (OrchestratorHandle { tx }, task)
}

async fn run(
    mut director: SessionDirector,
    mut commands: mpsc::Receiver<SessionCommand>,
    mut fired: mpsc::UnboundedReceiver<crate::session::TimerFired>,
    mut pipeline_events: mpsc::UnboundedReceiver<crate::pipeline::PipelineEvent>,
) {
    loop {
        // Pipeline results first, so a finished script is in the history
        // before any event queued behind it is applied.
        tokio::select! {
            biased;
            Some(event) = pipeline_events.recv() => director.on_pipeline_event(event),
            command = commands.recv() => match command {
                Some(SessionCommand::Event { event, reply }) => {
                    let action = director.on_event(event);
                    if reply.send(action).is_err() {
                        debug!(%action, "Event caller went away before the reply");
                    }
                }
                Some(SessionCommand::Reset { reply }) => {
                    info!("Session reset requested");
                    director.reset();
                    if reply.send(()).is_err() {
                        debug!("Reset caller went away before the reply");
                    }
                }
                Some(SessionCommand::Status { reply }) => {
                    if reply.send(director.snapshot()).is_err() {
                        debug!("Status caller went away before the reply");
                    }
                }
                Some(SessionCommand::Shutdown) | None => break,
            },
            Some(firing) = fired.recv() => director.on_timeout(firing),
        }
    }

    director.reset();
    info!("Session orchestrator stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{MockSynthesizer, RecordingSink};
    use crate::cast::Cast;
    use crate::scene::{GenerationMode, Participant, Station};
    use crate::script::MockGenerator;
    use std::sync::Arc;

    fn pipeline() -> Pipeline {
        Pipeline::new(
            Arc::new(MockGenerator::new()),
            Arc::new(MockSynthesizer::new()),
            Arc::new(RecordingSink::new(Duration::from_millis(100))),
            Arc::new(Cast::default()),
        )
    }

    fn event(station: &str, participant: &str) -> PresenceEvent {
        PresenceEvent {
            station: Station::new(station),
            participant: Participant::new(participant),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn handle_round_trips_commands() {
        let (handle, task) = spawn(pipeline(), SessionConfig::default());

        assert_eq!(
            handle.event(event("Desk", "Book")).await.unwrap(),
            Action::StartSession
        );
        let status = handle.status().await.unwrap();
        assert_eq!(status.station.as_deref(), Some("Desk"));

        handle.reset().await.unwrap();
        assert!(handle.status().await.unwrap().station.is_none());

        handle.shutdown().await.unwrap();
        task.await.unwrap();
        assert!(matches!(
            handle.status().await,
            Err(DioramaError::OrchestratorStopped)
        ));
        // Shutting down twice is fine.
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn finished_script_is_history_before_a_queued_arrival() {
        let script = "Desk: Hello Book.\nBook: Hello Desk.";
        let generator = MockGenerator::new().with_scripts(&[script, "Desk: Oh, Bag!"]);
        let pipeline = Pipeline::new(
            Arc::new(generator.clone()),
            Arc::new(MockSynthesizer::new()),
            Arc::new(RecordingSink::new(Duration::from_secs(30))),
            Arc::new(Cast::default()),
        );
        let config = SessionConfig::default();
        let (pipeline_tx, pipeline_rx) = mpsc::unbounded_channel();
        let (fired_tx, mut fired_rx) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let timers = SessionTimers::new(config.buffer, config.window, fired_tx);
        let mut director = SessionDirector::new(pipeline.with_events(pipeline_tx), timers);

        assert_eq!(director.on_event(event("Desk", "Book")), Action::StartSession);
        let firing = fired_rx.recv().await.unwrap();
        director.on_timeout(firing);
        tokio::time::sleep(Duration::from_millis(10)).await;

        // ScriptReady is already waiting when the arrival is queued
        let (reply, action) = oneshot::channel();
        tx.send(SessionCommand::Event {
            event: event("Desk", "Bag"),
            reply,
        })
        .await
        .unwrap();
        let task = tokio::spawn(run(director, rx, fired_rx, pipeline_rx));

        assert_eq!(action.await.unwrap(), Action::TriggerInterruption);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let calls = generator.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1].mode,
            GenerationMode::Interruption {
                newcomer: Participant::new("Bag"),
                prior_context: Some(script.to_string()),
            }
        );

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_stops_the_task() {
        let (handle, task) = spawn(pipeline(), SessionConfig::default());
        drop(handle);
        task.await.unwrap();
    }
}
