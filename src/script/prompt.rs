//! Prompt assembly for the script generator.
//!
//! Only the characters present in the scene are described, so the writer
//! cannot invent a speaker who is not in the room.

use crate::cast::Cast;
use crate::scene::{GenerationMode, SceneRequest};

/// System message: world, host, present characters, and format rules.
pub fn system_prompt(cast: &Cast, request: &SceneRequest) -> String {
    let host = request.station.as_str();
    let mut lines = vec!["--- WORLD ---".to_string(), cast.world.trim().to_string()];

    lines.push(format!("\n--- LOCATION ({host}) ---"));
    if let Some((_, character)) = cast.character(host) {
        lines.push(character.backstory.trim().to_string());
    }

    lines.push("\n--- CHARACTERS ---".to_string());
    for name in characters(request) {
        let Some((_, character)) = cast.character(name) else {
            continue;
        };
        lines.push(format!("<{name}>"));
        lines.push(format!("Description: {}", character.description.trim()));
        if !character.backstory.trim().is_empty() {
            lines.push(format!("Backstory: {}", character.backstory.trim()));
        }
        lines.push(format!("</{name}>"));
    }

    lines.push("\nRules:".to_string());
    lines.push("- Write 3-5 short lines of dialogue, max 10 words each.".to_string());
    lines.push("- Format every line as \"Name: Dialogue\". No Markdown.".to_string());
    lines.push(format!("- The host ({host}) must speak at least once."));
    lines.push(format!(
        "- Only these characters may speak: {}.",
        characters(request).join(", ")
    ));
    lines.join("\n")
}

/// User message: what should happen in this run.
pub fn user_message(request: &SceneRequest) -> String {
    match &request.mode {
        GenerationMode::Fresh => {
            let guests: Vec<&str> = request.participants.iter().map(|p| p.as_str()).collect();
            format!(
                "Start a conversation between {} and {}.",
                request.station,
                guests.join(", ")
            )
        }
        GenerationMode::Interruption {
            newcomer,
            prior_context,
        } => match prior_context {
            Some(context) if !context.trim().is_empty() => format!(
                "STOP! {newcomer} entered! Context: \"{}\". React.",
                context.trim()
            ),
            _ => format!("STOP! {newcomer} entered! React."),
        },
    }
}

/// Host first, then guests in arrival order.
fn characters(request: &SceneRequest) -> Vec<&str> {
    std::iter::once(request.station.as_str())
        .chain(request.participants.iter().map(|p| p.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Participant, Station};

    fn request(mode: GenerationMode) -> SceneRequest {
        SceneRequest {
            station: Station::new("Desk"),
            participants: vec![Participant::new("Book"), Participant::new("Bag")],
            mode,
        }
    }

    #[test]
    fn system_prompt_lists_only_present_characters() {
        let prompt = system_prompt(&Cast::default(), &request(GenerationMode::Fresh));
        assert!(prompt.contains("<Desk>"));
        assert!(prompt.contains("<Book>"));
        assert!(prompt.contains("<Bag>"));
        assert!(!prompt.contains("<Monitor>"));
        assert!(prompt.contains("Only these characters may speak: Desk, Book, Bag."));
    }

    #[test]
    fn system_prompt_skips_unknown_characters() {
        let mut req = request(GenerationMode::Fresh);
        req.participants.push(Participant::new("Ghost"));
        let prompt = system_prompt(&Cast::default(), &req);
        assert!(!prompt.contains("<Ghost>"));
    }

    #[test]
    fn fresh_message_names_everyone() {
        let message = user_message(&request(GenerationMode::Fresh));
        assert_eq!(message, "Start a conversation between Desk and Book, Bag.");
    }

    #[test]
    fn interruption_message_carries_context() {
        let message = user_message(&request(GenerationMode::Interruption {
            newcomer: Participant::new("Bag"),
            prior_context: Some("Desk: Hello.\nBook: Hi.".to_string()),
        }));
        assert!(message.starts_with("STOP! Bag entered!"));
        assert!(message.contains("Desk: Hello."));
    }

    #[test]
    fn interruption_without_context_still_reacts() {
        let message = user_message(&request(GenerationMode::Interruption {
            newcomer: Participant::new("Bag"),
            prior_context: None,
        }));
        assert_eq!(message, "STOP! Bag entered! React.");
    }
}
