//! Lookup tables for the installation: reader ids, tag uids, and the voice and
//! persona of every character.
//!
//! Defaults describe the shipped room (three pieces of furniture with readers,
//! four tagged objects). A `[cast]` section in the config replaces them.

use crate::defaults;
use crate::event::{PresenceEvent, ReaderEvent};
use crate::scene::{Participant, Station};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Voice settings handed to the synthesizer for one speaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceProfile {
    pub voice: String,
    pub style: String,
}

/// One character: a station or a tagged object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Character {
    pub voice: Option<String>,
    pub style: Option<String>,
    pub description: String,
    pub backstory: String,
}

impl Character {
    fn new(voice: &str, style: &str, description: &str, backstory: &str) -> Self {
        Self {
            voice: Some(voice.to_string()),
            style: Some(style.to_string()),
            description: description.to_string(),
            backstory: backstory.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Cast {
    /// Shared setting every script is written against.
    pub world: String,
    pub default_voice: String,
    pub default_style: String,
    /// Reader id → station name.
    pub stations: BTreeMap<String, String>,
    /// Tag uid (space separated hex bytes) → participant name.
    pub tags: BTreeMap<String, String>,
    /// Character name → persona.
    pub characters: BTreeMap<String, Character>,
}

impl Default for Cast {
    fn default() -> Self {
        let stations = [("1", "Bag rack"), ("2", "Bookshelf"), ("3", "Desk")]
            .into_iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect();

        let tags = [
            ("53 B5 11 60 21 00 01", "Book"),
            ("53 A0 94 65 21 00 01", "Andrea"),
            ("53 5B 06 60 21 00 01", "Bag"),
            ("53 60 0B 60 21 00 01", "Monitor"),
        ]
        .into_iter()
        .map(|(uid, name)| (uid.to_string(), name.to_string()))
        .collect();

        let characters = [
            (
                "Desk",
                Character::new(
                    "sage",
                    "Act like a dramatic mother. Warm but loud and fast.",
                    "Proud, motherly. English only.",
                    "Desk is proud and motherly.",
                ),
            ),
            (
                "Bookshelf",
                Character::new(
                    "onyx",
                    "Act like a snobby butler. Very dry, clipping words short.",
                    "Strict, orderly. English only.",
                    "Bookshelf is strict and orderly.",
                ),
            ),
            (
                "Bag rack",
                Character::new(
                    "sage",
                    "Act like a ghost whispering. Breathless and quick.",
                    "Patient, whispering. English only.",
                    "Bag rack is patient and observant.",
                ),
            ),
            (
                "Book",
                Character::new(
                    "ash",
                    "Act like a wise old scholar. Calm but rushing to explain.",
                    "Wise, calm. English only.",
                    "Book is wise and calm.",
                ),
            ),
            (
                "Monitor",
                Character::new(
                    "coral",
                    "Act like a breaking news anchor. Extremely fast and crisp.",
                    "Bright, fast. English only.",
                    "Monitor is focused and bright.",
                ),
            ),
            (
                "Bag",
                Character::new(
                    "ballad",
                    "Act like a complaining teenager. Fast, annoyed, snapping.",
                    "Restless, annoyed. English only.",
                    "Bag is restless and annoyed.",
                ),
            ),
            (
                "Andrea",
                Character::new(
                    "verse",
                    "Act like an emotional, loud professor.",
                    "Humorous professor who owns the room.",
                    "Andrea is a hardworking professor who often works past midnight.",
                ),
            ),
        ]
        .into_iter()
        .map(|(name, character)| (name.to_string(), character))
        .collect();

        Self {
            world: "This is Andrea's workspace. Objects are alive.".to_string(),
            default_voice: defaults::DEFAULT_VOICE.to_string(),
            default_style: defaults::DEFAULT_STYLE.to_string(),
            stations,
            tags,
            characters,
        }
    }
}

impl Cast {
    pub fn station(&self, reader_id: &str) -> Option<Station> {
        self.stations.get(reader_id.trim()).map(Station::new)
    }

    pub fn participant(&self, tag_uid: &str) -> Option<Participant> {
        self.tags.get(tag_uid.trim()).map(Participant::new)
    }

    /// Maps a decoded reader line to names. Unknown readers or tags yield `None`.
    pub fn resolve(&self, event: &ReaderEvent) -> Option<PresenceEvent> {
        let station = self.station(&event.reader_id)?;
        let participant = self.participant(&event.tag_uid)?;
        Some(PresenceEvent {
            station,
            participant,
        })
    }

    /// Case-insensitive character lookup; scripts do not keep our capitalisation.
    pub fn character(&self, name: &str) -> Option<(&str, &Character)> {
        let name = name.trim();
        self.characters
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(key, character)| (key.as_str(), character))
    }

    /// Voice for a speaker as written in a script.
    pub fn voice_for(&self, speaker: &str) -> VoiceProfile {
        let character = self.character(speaker).map(|(_, c)| c);
        VoiceProfile {
            voice: character
                .and_then(|c| c.voice.clone())
                .unwrap_or_else(|| self.default_voice.clone()),
            style: character
                .and_then(|c| c.style.clone())
                .unwrap_or_else(|| self.default_style.clone()),
        }
    }

    /// Reader id and uid for a participant name, used by the keyboard harness.
    pub fn tag_uid(&self, participant: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(participant))
            .map(|(uid, _)| uid.as_str())
    }

    pub fn reader_id(&self, station: &str) -> Option<&str> {
        self.stations
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(station))
            .map(|(id, _)| id.as_str())
    }
}
