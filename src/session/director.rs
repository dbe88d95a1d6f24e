//! The session state machine.
//!
//! `SessionDirector` owns the one live [`Session`], its two deadlines and the
//! pipeline. Its methods are plain `&mut self` calls; the orchestrator task
//! serializes every caller onto them.

use crate::event::PresenceEvent;
use crate::pipeline::{Pipeline, PipelineEvent};
use crate::scene::{GenerationMode, Participant, Session};
use crate::session::timers::{SessionTimers, TimerFired};
use crate::session::{Action, TimerKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Point-in-time view of the session, for status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub station: Option<String>,
    pub participants: Vec<String>,
    pub buffering: bool,
    pub window_open: bool,
    pub playing: bool,
    pub epoch: u64,
    pub has_history: bool,
}

pub struct SessionDirector {
    session: Session,
    timers: SessionTimers,
    pipeline: Pipeline,
}

impl SessionDirector {
    pub fn new(pipeline: Pipeline, timers: SessionTimers) -> Self {
        Self {
            session: Session::new(),
            timers,
            pipeline,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn timers(&self) -> &SessionTimers {
        &self.timers
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Applies one presence event.
    pub fn on_event(&mut self, event: PresenceEvent) -> Action {
        let PresenceEvent {
            station,
            participant,
        } = event;

        if self.session.station() != Some(&station) {
            if self.session.is_open() {
                info!(from = ?self.session.station().map(|s| s.as_str()), to = %station, "Station changed, resetting scene");
            }
            self.reset();
            info!(%station, %participant, "Scene opened");
            self.session.begin(station, participant);
            self.timers.start(TimerKind::Buffer);
            return Action::StartSession;
        }

        if self.session.contains(&participant) {
            debug!(%station, %participant, "Duplicate read ignored");
            return Action::Ignore;
        }

        self.session.add(participant.clone());

        if self.timers.is_pending(TimerKind::Buffer) {
            info!(%station, %participant, "Joined while buffering");
            return Action::JoinBuffering;
        }

        if self.timers.is_pending(TimerKind::Window) {
            info!(%station, %participant, "Interruption");
            self.interrupt(participant);
            return Action::TriggerInterruption;
        }

        warn!(%station, %participant, "Scene open with no deadline pending, restarting buffer");
        self.timers.start(TimerKind::Buffer);
        Action::StartSession
    }

    /// Handles a deadline firing. Stale firings are ignored.
    pub fn on_timeout(&mut self, fired: TimerFired) {
        if !self.timers.consume(fired) {
            return;
        }
        match fired.kind {
            TimerKind::Buffer => {
                self.timers.start(TimerKind::Window);
                self.generate(GenerationMode::Fresh);
            }
            TimerKind::Window => {
                info!(station = ?self.session.station().map(|s| s.as_str()), "Session window elapsed");
                self.reset();
            }
        }
    }

    /// Records scripts from the current run as context for interruptions.
    pub fn on_pipeline_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::ScriptReady { epoch, script } => {
                if self.pipeline.gate().is_current(epoch) && self.session.is_open() {
                    self.session.set_history(script);
                } else {
                    debug!(epoch, "Script from superseded run dropped");
                }
            }
            PipelineEvent::Finished(report) => {
                debug!(epoch = report.epoch, outcome = ?report.outcome, "Run finished");
            }
        }
    }

    /// Stops audio, cancels both deadlines and clears the session. Idempotent.
    pub fn reset(&mut self) {
        self.timers.cancel_all();
        self.pipeline.stop();
        self.session.clear();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            station: self.session.station().map(|s| s.to_string()),
            participants: self
                .session
                .participants()
                .iter()
                .map(|p| p.to_string())
                .collect(),
            buffering: self.timers.is_pending(TimerKind::Buffer),
            window_open: self.timers.is_pending(TimerKind::Window),
            playing: self.pipeline.is_playing(),
            epoch: self.pipeline.gate().current(),
            has_history: self.session.history().is_some(),
        }
    }

    fn interrupt(&mut self, newcomer: Participant) {
        self.pipeline.stop();
        self.timers.start(TimerKind::Window);
        let prior_context = self.session.history().map(str::to_string);
        self.generate(GenerationMode::Interruption {
            newcomer,
            prior_context,
        });
    }

    fn generate(&mut self, mode: GenerationMode) {
        match self.session.request(mode) {
            Some(request) => {
                // The run reports through the pipeline's event channel.
                drop(self.pipeline.run(request));
            }
            None => warn!("Generation requested with no open scene"),
        }
    }
}
