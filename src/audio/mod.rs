//! Speech synthesis and playback.

pub mod asset;
pub mod player;
pub mod sink;
pub mod synthesizer;

pub use asset::{AssetData, AssetStore, AudioAsset};
pub use player::CommandPlayer;
pub use sink::{AudioSink, PlaybackOutcome, RecordingSink, SinkEvent};
pub use synthesizer::{MockSynthesizer, SynthesisRequest, Synthesizer};
