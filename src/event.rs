//! Reader board line decoding.
//!
//! The board prints one line per detection, e.g. `(Reader 3, 53 A0 94 65 21 00 01)`.

use crate::scene::{Participant, Station};

/// A raw detection: which reader saw which tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderEvent {
    pub reader_id: String,
    pub tag_uid: String,
}

/// A detection mapped to names through the cast tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEvent {
    pub station: Station,
    pub participant: Participant,
}

const READER_MARKER: &str = "(Reader ";

/// Decodes a reader board line. Returns `None` for anything else the board
/// prints (boot banners, debug output, partial lines).
pub fn parse_reader_line(line: &str) -> Option<ReaderEvent> {
    let mut search = line;
    while let Some(start) = search.find(READER_MARKER) {
        let rest = &search[start + READER_MARKER.len()..];
        if let Some(event) = parse_reader_body(rest) {
            return Some(event);
        }
        search = rest;
    }
    None
}

/// Parses `3, 53 A0 ...)` following the marker.
fn parse_reader_body(rest: &str) -> Option<ReaderEvent> {
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let reader_id = &rest[..digits_end];

    let rest = rest[digits_end..].strip_prefix(", ")?;
    let close = rest.find(')')?;
    let uid = &rest[..close];
    let is_uid_char = |c: char| c.is_ascii_digit() || ('A'..='F').contains(&c) || c == ' ';
    if uid.is_empty() || !uid.chars().all(is_uid_char) {
        return None;
    }

    let uid = uid.trim();
    if uid.is_empty() {
        return None;
    }

    Some(ReaderEvent {
        reader_id: reader_id.to_string(),
        tag_uid: uid.to_string(),
    })
}
