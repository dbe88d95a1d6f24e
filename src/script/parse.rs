//! Splitting a generated script into ordered utterances.

/// One spoken line of a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub speaker: String,
    pub text: String,
    /// Position among the kept lines, starting at 0.
    pub sequence_index: usize,
}

/// Parses `Speaker: line` text into utterances.
///
/// Lines without a `:` delimiter, with nothing after it, or whose speaker
/// reduces to nothing after [`clean_speaker`] are dropped. Indexes are
/// consecutive over the kept lines.
pub fn parse_script(script: &str) -> Vec<Utterance> {
    let mut utterances = Vec::new();
    for line in script.lines() {
        let Some((raw_speaker, raw_text)) = line.split_once(':') else {
            continue;
        };
        let speaker = clean_speaker(raw_speaker);
        let text = raw_text.trim();
        if speaker.is_empty() || text.is_empty() {
            continue;
        }
        utterances.push(Utterance {
            speaker,
            text: text.to_string(),
            sequence_index: utterances.len(),
        });
    }
    utterances
}

/// Strips markup and numbering from a speaker label: only ASCII letters and
/// spaces survive, then the result is trimmed. `**Bag rack**` → `Bag rack`.
pub fn clean_speaker(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lines_in_order() {
        let script = "Desk: Welcome back.\nBook: I was reading.\nBag: Ugh.";
        let utterances = parse_script(script);
        assert_eq!(utterances.len(), 3);
        assert_eq!(utterances[0].speaker, "Desk");
        assert_eq!(utterances[0].text, "Welcome back.");
        assert_eq!(utterances[2].speaker, "Bag");
        let indexes: Vec<usize> = utterances.iter().map(|u| u.sequence_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn drops_lines_without_delimiter() {
        let script = "Scene one\nDesk: Hello.\n\n(silence)\nBook: Hi.";
        let utterances = parse_script(script);
        assert_eq!(utterances.len(), 2);
        assert_eq!(utterances[1].sequence_index, 1);
        assert_eq!(utterances[1].speaker, "Book");
    }

    #[test]
    fn splits_on_first_colon_only() {
        let utterances = parse_script("Monitor: Breaking: it is 1:00 AM!");
        assert_eq!(utterances[0].speaker, "Monitor");
        assert_eq!(utterances[0].text, "Breaking: it is 1:00 AM!");
    }

    #[test]
    fn drops_empty_text_and_empty_speaker() {
        assert!(parse_script("Desk:").is_empty());
        assert!(parse_script("Desk:    ").is_empty());
        assert!(parse_script("**: hello").is_empty());
        assert!(parse_script(": hello").is_empty());
    }

    #[test]
    fn cleans_markdown_speakers() {
        let utterances = parse_script("**Bag rack**: Shh.\r\n1. Book: Quiet.");
        assert_eq!(utterances[0].speaker, "Bag rack");
        assert_eq!(utterances[0].text, "Shh.");
        assert_eq!(utterances[1].speaker, "Book");
    }

    #[test]
    fn empty_script_yields_nothing() {
        assert!(parse_script("").is_empty());
        assert!(parse_script("\n\n").is_empty());
    }

    #[test]
    fn clean_speaker_keeps_letters_and_spaces() {
        assert_eq!(clean_speaker("  Andrea (angry) "), "Andrea angry");
        assert_eq!(clean_speaker("Bag-rack"), "Bagrack");
        assert_eq!(clean_speaker("123"), "");
    }
}
