//! JSON line protocol between the CLI and a running daemon.

use crate::session::{Action, SessionSnapshot};
use serde::{Deserialize, Serialize};

/// Requests sent by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// A named presence event, bypassing the cast tables.
    Event { station: String, participant: String },
    /// A raw reading, resolved through the cast like a board line.
    Reading { reader: String, tag: String },
    /// Stop audio and clear the session
    Reset,
    Status,
    Shutdown,
}

impl Command {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Replies sent by the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Ok,
    /// What an event did to the session
    Action { action: Action },
    Status {
        station: Option<String>,
        participants: Vec<String>,
        buffering: bool,
        window_open: bool,
        playing: bool,
        epoch: u64,
    },
    Error { message: String },
}

impl Response {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }
}

impl From<SessionSnapshot> for Response {
    fn from(snapshot: SessionSnapshot) -> Self {
        Response::Status {
            station: snapshot.station,
            participants: snapshot.participants,
            buffering: snapshot.buffering,
            window_open: snapshot.window_open,
            playing: snapshot.playing,
            epoch: snapshot.epoch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_use_snake_case_type_tag() {
        let json = Command::Event {
            station: "Desk".to_string(),
            participant: "Book".to_string(),
        }
        .to_json()
        .unwrap();
        assert_eq!(
            json,
            r#"{"type":"event","station":"Desk","participant":"Book"}"#
        );
        assert_eq!(Command::Reset.to_json().unwrap(), r#"{"type":"reset"}"#);
    }

    #[test]
    fn reading_command_parses_from_hand_written_json() {
        let command =
            Command::from_json(r#"{"type":"reading","reader":"3","tag":"53 A0 94 65 21 00 01"}"#)
                .unwrap();
        assert_eq!(
            command,
            Command::Reading {
                reader: "3".to_string(),
                tag: "53 A0 94 65 21 00 01".to_string(),
            }
        );
    }

    #[test]
    fn action_response_nests_snake_case_action() {
        let json = Response::Action {
            action: Action::JoinBuffering,
        }
        .to_json()
        .unwrap();
        assert_eq!(json, r#"{"type":"action","action":"join_buffering"}"#);
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(Command::from_json(r#"{"type":"toggle"}"#).is_err());
        assert!(Command::from_json("not json").is_err());
    }

    #[test]
    fn status_from_snapshot() {
        let response = Response::from(SessionSnapshot {
            station: Some("Desk".to_string()),
            participants: vec!["Book".to_string()],
            buffering: false,
            window_open: true,
            playing: true,
            epoch: 4,
            has_history: true,
        });
        let json = response.to_json().unwrap();
        assert!(json.contains(r#""type":"status""#));
        assert_eq!(Response::from_json(&json).unwrap(), response);
    }
}
