//! Terminal rendering for the harness and the IPC client commands.

use crate::input::SourceStats;
use crate::ipc::protocol::Response;
use crate::session::{Action, SessionSnapshot};

const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

fn action_color(action: Action) -> &'static str {
    match action {
        Action::StartSession => GREEN,
        Action::JoinBuffering => "",
        Action::TriggerInterruption => YELLOW,
        Action::Ignore => DIM,
    }
}

/// `→ start_session`, colored by what happened.
pub fn render_action(action: Action, color: bool) -> String {
    let c = if color { action_color(action) } else { "" };
    if c.is_empty() {
        format!("→ {action}")
    } else {
        format!("{c}→ {action}{RESET}")
    }
}

/// Status block; the field set mirrors [`Response::Status`].
pub fn render_status(
    station: Option<&str>,
    participants: &[String],
    buffering: bool,
    window_open: bool,
    playing: bool,
    epoch: u64,
) -> String {
    let station = station.unwrap_or("(none)");
    let participants = if participants.is_empty() {
        "(none)".to_string()
    } else {
        participants.join(", ")
    };
    let phase = match (buffering, window_open) {
        (true, _) => "buffering",
        (false, true) => "window open",
        (false, false) => "idle",
    };
    format!(
        "station:      {station}\n\
         participants: {participants}\n\
         phase:        {phase}\n\
         playing:      {}\n\
         epoch:        {epoch}",
        if playing { "yes" } else { "no" }
    )
}

pub fn render_snapshot(snapshot: &SessionSnapshot) -> String {
    render_status(
        snapshot.station.as_deref(),
        &snapshot.participants,
        snapshot.buffering,
        snapshot.window_open,
        snapshot.playing,
        snapshot.epoch,
    )
}

/// Human-readable form of a daemon reply.
pub fn render_response(response: &Response, color: bool) -> String {
    match response {
        Response::Ok => "OK".to_string(),
        Response::Action { action } => render_action(*action, color),
        Response::Status {
            station,
            participants,
            buffering,
            window_open,
            playing,
            epoch,
        } => render_status(
            station.as_deref(),
            participants,
            *buffering,
            *window_open,
            *playing,
            *epoch,
        ),
        Response::Error { message } if color => format!("{RED}Error: {message}{RESET}"),
        Response::Error { message } => format!("Error: {message}"),
    }
}

pub fn render_source_stats(stats: &SourceStats) -> String {
    format!(
        "{} lines, {} readings, {} unknown, {} forwarded",
        stats.lines, stats.readings, stats.unknown, stats.forwarded
    )
}
