//! Generation-and-playback pipeline.

pub mod epoch;
pub mod sequencer;

pub use epoch::{Epoch, EpochGate};
pub use sequencer::{Pipeline, PipelineEvent, RunOutcome, RunReport};
