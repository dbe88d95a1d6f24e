//! The "current run" marker shared by the session director and pipeline runs.
//!
//! Each run owns an [`Epoch`]: an id plus a cancellation token. Starting a new
//! run or stopping audio cancels the previous token and bumps the id under one
//! lock, so a run that rechecks its id can never observe a half-replaced
//! marker, and anything awaiting the token wakes immediately.

use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// One generation-and-playback run's identity.
#[derive(Debug, Clone)]
pub struct Epoch {
    pub id: u64,
    pub token: CancellationToken,
}

impl Epoch {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug)]
struct GateState {
    id: u64,
    token: CancellationToken,
    playing: bool,
}

/// Mints epochs and answers "is this run still current?".
#[derive(Debug)]
pub struct EpochGate {
    state: Mutex<GateState>,
}

impl Default for EpochGate {
    fn default() -> Self {
        Self::new()
    }
}

impl EpochGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                id: 0,
                token: CancellationToken::new(),
                playing: false,
            }),
        }
    }

    /// Supersedes the current run and returns the new one, marked playing.
    pub fn begin(&self) -> Epoch {
        let mut state = self.lock();
        state.token.cancel();
        state.id += 1;
        state.token = CancellationToken::new();
        state.playing = true;
        Epoch {
            id: state.id,
            token: state.token.clone(),
        }
    }

    /// Stops whatever is running without starting anything. Safe to call
    /// when nothing is running.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.token.cancel();
        state.id += 1;
        state.token = CancellationToken::new();
        state.playing = false;
    }

    /// Marks `epoch` done. Ignored if a newer run has taken over.
    pub fn finish(&self, epoch: &Epoch) {
        let mut state = self.lock();
        if state.id == epoch.id {
            state.playing = false;
        }
    }

    pub fn is_current(&self, id: u64) -> bool {
        self.lock().id == id
    }

    pub fn current(&self) -> u64 {
        self.lock().id
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
