//! Default configuration constants for diorama.
//!
//! Shared by the config types, the cast tables and the CLI so the same numbers
//! are never spelled twice.

/// Buffer window in milliseconds.
///
/// Tags that land on the same station within this window after the first one
/// join the opening scene instead of interrupting it.
pub const BUFFER_WINDOW_MS: u64 = 2000;

/// Session window in milliseconds.
///
/// How long a scene stays interruptible after its last generation run. Renewed
/// by every run, including interruptions.
pub const SESSION_WINDOW_MS: u64 = 35_000;

/// Serial line speed of the reader board. The tty is configured externally;
/// the value is kept for diagnostics output.
pub const BAUD_RATE: u32 = 9600;

/// Chat model used to write scripts.
pub const GENERATION_MODEL: &str = "gpt-4o-mini";

/// Token cap for a generated script. Scenes are meant to be short.
pub const GENERATION_MAX_TOKENS: u32 = 150;

/// Audio-capable chat model used to voice each line.
pub const SYNTHESIS_MODEL: &str = "gpt-4o-mini-audio-preview";

/// Container format requested from the synthesis service.
pub const AUDIO_FORMAT: &str = "mp3";

/// OpenAI-compatible API root.
pub const API_BASE_URL: &str = "https://api.openai.com/v1";

/// Voice for speakers missing from the cast.
pub const DEFAULT_VOICE: &str = "alloy";

/// Acting direction for speakers missing from the cast.
pub const DEFAULT_STYLE: &str = "Speak fast.";

/// Prefix of every temporary audio file, so stale files are easy to spot.
pub const ASSET_PREFIX: &str = "diorama";

/// Player command used when the config does not name one.
pub fn player_command() -> Vec<String> {
    if cfg!(target_os = "macos") {
        vec!["afplay".to_string()]
    } else {
        vec!["mpg123".to_string(), "-q".to_string()]
    }
}
