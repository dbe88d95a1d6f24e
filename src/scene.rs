//! Scene data: who is where, and what a generation run is asked to write.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A physical reading location (a piece of furniture with a reader under it).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Station(String);

impl Station {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tagged object that can take part in a scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Participant(String);

impl Participant {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a generation run relates to what was playing before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationMode {
    /// Opening scene after the buffer window closed.
    Fresh,
    /// A newcomer arrived while a scene was live.
    Interruption {
        newcomer: Participant,
        /// Script of the run being cut off, if it produced one.
        prior_context: Option<String>,
    },
}

impl GenerationMode {
    pub fn label(&self) -> &'static str {
        match self {
            GenerationMode::Fresh => "fresh",
            GenerationMode::Interruption { .. } => "interruption",
        }
    }

    pub fn is_interruption(&self) -> bool {
        matches!(self, GenerationMode::Interruption { .. })
    }
}

/// Everything the script generator is told about one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneRequest {
    pub station: Station,
    /// Present participants in arrival order.
    pub participants: Vec<Participant>,
    pub mode: GenerationMode,
}

/// The single live scene.
///
/// Invariant: `station` is `None` exactly when `participants` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    station: Option<Station>,
    participants: Vec<Participant>,
    history: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn station(&self) -> Option<&Station> {
        self.station.as_ref()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn history(&self) -> Option<&str> {
        self.history.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.station.is_some()
    }

    pub fn contains(&self, participant: &Participant) -> bool {
        self.participants.contains(participant)
    }

    /// Replaces whatever was here with a new scene holding one participant.
    pub fn begin(&mut self, station: Station, participant: Participant) {
        self.station = Some(station);
        self.participants.clear();
        self.participants.push(participant);
        self.history = None;
    }

    /// Adds a participant to the open scene. Returns false for duplicates and
    /// when no scene is open.
    pub fn add(&mut self, participant: Participant) -> bool {
        if self.station.is_none() || self.contains(&participant) {
            return false;
        }
        self.participants.push(participant);
        true
    }

    pub fn set_history(&mut self, script: String) {
        self.history = Some(script);
    }

    pub fn clear(&mut self) {
        self.station = None;
        self.participants.clear();
        self.history = None;
    }

    /// Builds the generation request for the current scene.
    pub fn request(&self, mode: GenerationMode) -> Option<SceneRequest> {
        let station = self.station.clone()?;
        Some(SceneRequest {
            station,
            participants: self.participants.clone(),
            mode,
        })
    }
}
