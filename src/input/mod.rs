//! Where presence events come from: the reader board or the keyboard harness.

pub mod harness;
pub mod source;

pub use harness::{HarnessCommand, key_help, parse_command};
pub use source::{LineReader, SourceStats, forward_readings, open};
