//! Session state machine: decides when a scene starts, who is in it, when it
//! is interrupted and when it ends.

pub mod director;
pub mod orchestrator;
pub mod timers;

pub use director::{SessionDirector, SessionSnapshot};
pub use orchestrator::{OrchestratorHandle, SessionConfig, spawn};
pub use timers::{SessionTimers, TimerFired};

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a presence event did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// A new scene opened; generation waits for the buffer deadline.
    StartSession,
    /// Joined a scene whose buffer deadline has not passed yet.
    JoinBuffering,
    /// Joined a speaking scene; audio was cut and a reaction is being written.
    TriggerInterruption,
    /// Duplicate read, nothing changed.
    Ignore,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::StartSession => "start_session",
            Action::JoinBuffering => "join_buffering",
            Action::TriggerInterruption => "trigger_interruption",
            Action::Ignore => "ignore",
        };
        f.write_str(name)
    }
}

/// The two session deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Short: coalesces near-simultaneous arrivals.
    Buffer,
    /// Long: bounds how long a scene stays interruptible.
    Window,
}
