//! Audio output seam.
//!
//! A sink plays one asset at a time. Stopping is signalled through a
//! [`CancellationToken`]; cancelling after playback finished is a no-op, which
//! makes "kill" idempotent for every implementation.

use crate::audio::asset::AudioAsset;
use crate::error::{DioramaError, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// How a play call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Played to the end.
    Finished,
    /// Stopped through the token.
    Killed,
}

/// Plays audio assets.
#[async_trait::async_trait]
pub trait AudioSink: Send + Sync {
    /// Play `asset` until it ends or `stop` is cancelled.
    async fn play(&self, asset: &AudioAsset, stop: CancellationToken) -> Result<PlaybackOutcome>;

    /// Name for logging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// What a [`RecordingSink`] observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Started {
        epoch: u64,
        index: usize,
        label: String,
    },
    Finished {
        epoch: u64,
        index: usize,
    },
    Killed {
        epoch: u64,
        index: usize,
    },
}

/// Sink that "plays" for a fixed duration and records every call.
///
/// Used by tests and by the offline harness.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    play_duration: Duration,
    failing: HashSet<usize>,
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn new(play_duration: Duration) -> Self {
        Self {
            play_duration,
            failing: HashSet::new(),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Report a playback error for this sequence index.
    pub fn with_failure_at(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `(epoch, index)` of every play that started, in order.
    pub fn started(&self) -> Vec<(u64, usize)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Started { epoch, index, .. } => Some((epoch, index)),
                _ => None,
            })
            .collect()
    }

    /// Labels of every play that started, in order.
    pub fn started_labels(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Started { label, .. } => Some(label),
                _ => None,
            })
            .collect()
    }

    /// `(epoch, index)` of every play that was killed.
    pub fn killed(&self) -> Vec<(u64, usize)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Killed { epoch, index } => Some((epoch, index)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: SinkEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[async_trait::async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, asset: &AudioAsset, stop: CancellationToken) -> Result<PlaybackOutcome> {
        let (epoch, index) = (asset.epoch(), asset.index());
        let label = asset.label();
        info!(epoch, index, "▶ {}", label);
        self.record(SinkEvent::Started {
            epoch,
            index,
            label,
        });

        if self.failing.contains(&index) {
            return Err(DioramaError::Playback {
                message: format!("recording sink failure at {index}"),
            });
        }

        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                self.record(SinkEvent::Killed { epoch, index });
                Ok(PlaybackOutcome::Killed)
            }
            _ = tokio::time::sleep(self.play_duration) => {
                self.record(SinkEvent::Finished { epoch, index });
                Ok(PlaybackOutcome::Finished)
            }
        }
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(index: usize) -> AudioAsset {
        AudioAsset::in_memory(1, index, format!("line {index}").into_bytes())
    }

    #[tokio::test(start_paused = true)]
    async fn plays_for_configured_duration() {
        let sink = RecordingSink::new(Duration::from_secs(2));
        let start = tokio::time::Instant::now();
        let outcome = sink.play(&asset(0), CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Finished);
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(
            sink.events(),
            vec![
                SinkEvent::Started {
                    epoch: 1,
                    index: 0,
                    label: "line 0".to_string()
                },
                SinkEvent::Finished { epoch: 1, index: 0 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_token_kills_playback() {
        let sink = RecordingSink::new(Duration::from_secs(60));
        let stop = CancellationToken::new();
        let killer = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            killer.cancel();
        });

        let outcome = sink.play(&asset(0), stop).await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Killed);
        assert_eq!(sink.killed(), vec![(1, 0)]);
    }

    #[tokio::test]
    async fn cancelling_after_finish_is_harmless() {
        let sink = RecordingSink::new(Duration::ZERO);
        let stop = CancellationToken::new();
        sink.play(&asset(0), stop.clone()).await.unwrap();
        stop.cancel();
        stop.cancel();
        assert!(sink.killed().is_empty());
    }

    #[tokio::test]
    async fn configured_failure_is_reported() {
        let sink = RecordingSink::new(Duration::ZERO).with_failure_at(1);
        assert!(sink.play(&asset(1), CancellationToken::new()).await.is_err());
        assert_eq!(sink.started(), vec![(1, 1)]);
    }
}
