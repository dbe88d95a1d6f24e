//! Line-driven stand-in for the reader board.
//!
//! Digits place a preset object on the Desk, just like tapping a tag:
//! `1` Andrea, `2` Bag, `3` Book, `4` Monitor. `r` resets, `s` shows status,
//! `q` quits. `reading <reader> <uid>` injects a raw reading and
//! `<station>: <participant>` a named one.

use crate::cast::Cast;
use crate::event::{PresenceEvent, ReaderEvent};
use crate::scene::{Participant, Station};

/// Reader the presets are placed on.
const PRESET_READER: &str = "3";

const PRESETS: [(&str, &str); 4] = [("1", "Andrea"), ("2", "Bag"), ("3", "Book"), ("4", "Monitor")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessCommand {
    Reading(ReaderEvent),
    Presence(PresenceEvent),
    Reset,
    Status,
    Help,
    Quit,
}

/// One-line summary of the key map.
pub fn key_help() -> String {
    let presets: Vec<String> = PRESETS
        .iter()
        .map(|(key, name)| format!("{key}:{name}"))
        .collect();
    format!(
        "{} (on reader {PRESET_READER}), r:reset, s:status, q:quit, ?:help",
        presets.join(", ")
    )
}

/// Parses one harness line. `Ok(None)` for blank lines.
pub fn parse_command(line: &str, cast: &Cast) -> Result<Option<HarnessCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    if let Some((_, name)) = PRESETS.iter().find(|(key, _)| *key == line) {
        let uid = cast
            .tag_uid(name)
            .ok_or_else(|| format!("preset {line} ({name}) has no tag in the cast"))?;
        return Ok(Some(HarnessCommand::Reading(ReaderEvent {
            reader_id: PRESET_READER.to_string(),
            tag_uid: uid.to_string(),
        })));
    }

    match line.to_ascii_lowercase().as_str() {
        "r" | "reset" => return Ok(Some(HarnessCommand::Reset)),
        "s" | "status" => return Ok(Some(HarnessCommand::Status)),
        "q" | "quit" | "exit" => return Ok(Some(HarnessCommand::Quit)),
        "?" | "h" | "help" => return Ok(Some(HarnessCommand::Help)),
        _ => {}
    }

    if let Some(rest) = line.strip_prefix("reading ") {
        let (reader, uid) = rest
            .trim()
            .split_once(' ')
            .ok_or_else(|| "usage: reading <reader> <uid>".to_string())?;
        return Ok(Some(HarnessCommand::Reading(ReaderEvent {
            reader_id: reader.trim().to_string(),
            tag_uid: uid.trim().to_ascii_uppercase(),
        })));
    }

    if let Some((station, participant)) = line.split_once(':') {
        let (station, participant) = (station.trim(), participant.trim());
        if station.is_empty() || participant.is_empty() {
            return Err("usage: <station>: <participant>".to_string());
        }
        return Ok(Some(HarnessCommand::Presence(PresenceEvent {
            station: Station::new(canonical_station(cast, station)),
            participant: Participant::new(canonical_participant(cast, participant)),
        })));
    }

    Err(format!("unrecognized input {line:?}; {}", key_help()))
}

/// Cast spelling of a station name, so `desk` and `Desk` are one station.
fn canonical_station(cast: &Cast, name: &str) -> String {
    cast.stations
        .values()
        .find(|known| known.eq_ignore_ascii_case(name))
        .cloned()
        .unwrap_or_else(|| name.to_string())
}

fn canonical_participant(cast: &Cast, name: &str) -> String {
    cast.tags
        .values()
        .find(|known| known.eq_ignore_ascii_case(name))
        .cloned()
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Option<HarnessCommand>, String> {
        parse_command(line, &Cast::default())
    }

    #[test]
    fn presets_place_tags_on_the_desk() {
        let Ok(Some(HarnessCommand::Reading(reading))) = parse("1") else {
            panic!("expected a reading");
        };
        assert_eq!(reading.reader_id, "3");
        assert_eq!(reading.tag_uid, "53 A0 94 65 21 00 01");

        let presence = Cast::default().resolve(&reading).unwrap();
        assert_eq!(presence.station.as_str(), "Desk");
        assert_eq!(presence.participant.as_str(), "Andrea");
    }

    #[test]
    fn control_words() {
        assert_eq!(parse("r"), Ok(Some(HarnessCommand::Reset)));
        assert_eq!(parse("RESET"), Ok(Some(HarnessCommand::Reset)));
        assert_eq!(parse("s"), Ok(Some(HarnessCommand::Status)));
        assert_eq!(parse("q"), Ok(Some(HarnessCommand::Quit)));
        assert_eq!(parse("?"), Ok(Some(HarnessCommand::Help)));
        assert_eq!(parse("   "), Ok(None));
    }

    #[test]
    fn raw_reading() {
        assert_eq!(
            parse("reading 2 53 b5 11 60 21 00 01"),
            Ok(Some(HarnessCommand::Reading(ReaderEvent {
                reader_id: "2".to_string(),
                tag_uid: "53 B5 11 60 21 00 01".to_string(),
            })))
        );
        assert!(parse("reading 2").is_err());
    }

    #[test]
    fn named_presence_uses_cast_spelling() {
        assert_eq!(
            parse("bookshelf: monitor"),
            Ok(Some(HarnessCommand::Presence(PresenceEvent {
                station: Station::new("Bookshelf"),
                participant: Participant::new("Monitor"),
            })))
        );
        assert!(parse(": Monitor").is_err());
    }

    #[test]
    fn unknown_input_mentions_keys() {
        let err = parse("7").unwrap_err();
        assert!(err.contains("1:Andrea"));
    }

    #[test]
    fn preset_without_tag_is_reported() {
        let mut cast = Cast::default();
        cast.tags.clear();
        assert!(parse_command("2", &cast).unwrap_err().contains("Bag"));
    }
}
