//! Generation-and-playback run: write a script, synthesize every line at once,
//! play the results strictly in script order.
//!
//! A run is one tokio task bound to an [`Epoch`]. Superseding it cancels the
//! epoch token, which stops the sink, wakes any await in the consumption loop
//! and aborts synthesis tasks that have not been consumed yet.

use crate::audio::{AudioAsset, AudioSink, PlaybackOutcome, SynthesisRequest, Synthesizer};
use crate::cast::Cast;
use crate::error::Result;
use crate::pipeline::epoch::{Epoch, EpochGate};
use crate::scene::SceneRequest;
use crate::script::{ScriptGenerator, Utterance, parse_script};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every line was played or skipped.
    Completed,
    /// A newer run (or a stop) took over.
    Superseded,
    GenerationFailed,
    /// The script had no usable `Speaker: line` lines.
    EmptyScript,
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub epoch: u64,
    pub utterances: usize,
    pub played: usize,
    /// Lines whose synthesis failed.
    pub skipped: usize,
    /// Lines whose playback failed (treated as finished).
    pub playback_errors: usize,
    pub outcome: RunOutcome,
}

impl RunReport {
    fn new(epoch: u64) -> Self {
        Self {
            epoch,
            utterances: 0,
            played: 0,
            skipped: 0,
            playback_errors: 0,
            outcome: RunOutcome::Completed,
        }
    }
}

/// Progress notifications for whoever owns the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// The generator answered; `script` is the raw text.
    ScriptReady { epoch: u64, script: String },
    Finished(RunReport),
}

/// The collaborators a run needs, shared by every run.
#[derive(Clone)]
pub struct Pipeline {
    generator: Arc<dyn ScriptGenerator>,
    synthesizer: Arc<dyn Synthesizer>,
    sink: Arc<dyn AudioSink>,
    cast: Arc<Cast>,
    gate: Arc<EpochGate>,
    /// Held while an asset is at the sink, so at most one plays at a time.
    playback: Arc<Mutex<()>>,
    events: Option<mpsc::UnboundedSender<PipelineEvent>>,
}

impl Pipeline {
    pub fn new(
        generator: Arc<dyn ScriptGenerator>,
        synthesizer: Arc<dyn Synthesizer>,
        sink: Arc<dyn AudioSink>,
        cast: Arc<Cast>,
    ) -> Self {
        Self {
            generator,
            synthesizer,
            sink,
            cast,
            gate: Arc::new(EpochGate::new()),
            playback: Arc::new(Mutex::new(())),
            events: None,
        }
    }

    /// Report script and completion events on `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn gate(&self) -> &Arc<EpochGate> {
        &self.gate
    }

    pub fn cast(&self) -> &Arc<Cast> {
        &self.cast
    }

    pub fn is_playing(&self) -> bool {
        self.gate.is_playing()
    }

    /// Starts a run for `request`, superseding any run in progress.
    ///
    /// The previous run is halted before this returns; the new run's slow
    /// work happens on the spawned task. Must be called inside a tokio runtime.
    pub fn run(&self, request: SceneRequest) -> JoinHandle<RunReport> {
        let epoch = self.gate.begin();
        info!(
            epoch = epoch.id,
            mode = request.mode.label(),
            station = %request.station,
            participants = request.participants.len(),
            "Starting generation run"
        );
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.execute(epoch, request).await })
    }

    /// Halts audio and invalidates the current run. Idempotent.
    pub fn stop(&self) {
        debug!(epoch = self.gate.current(), "Stopping playback");
        self.gate.invalidate();
    }

    async fn execute(self, epoch: Epoch, request: SceneRequest) -> RunReport {
        let mut report = RunReport::new(epoch.id);
        let outcome = self.drive(&epoch, &request, &mut report).await;
        report.outcome = outcome;
        self.gate.finish(&epoch);
        info!(
            epoch = epoch.id,
            outcome = ?report.outcome,
            played = report.played,
            skipped = report.skipped,
            "Generation run ended"
        );
        self.emit(PipelineEvent::Finished(report.clone()));
        report
    }

    async fn drive(&self, epoch: &Epoch, request: &SceneRequest, report: &mut RunReport) -> RunOutcome {
        let generated = tokio::select! {
            biased;
            _ = epoch.token.cancelled() => return RunOutcome::Superseded,
            result = self.generator.generate(request) => result,
        };
        let script = match generated {
            Ok(script) => script,
            Err(e) => {
                warn!(epoch = epoch.id, generator = self.generator.name(), error = %e, "Script generation failed");
                return RunOutcome::GenerationFailed;
            }
        };
        if !self.gate.is_current(epoch.id) {
            return RunOutcome::Superseded;
        }
        self.emit(PipelineEvent::ScriptReady {
            epoch: epoch.id,
            script: script.clone(),
        });

        let utterances = parse_script(&script);
        report.utterances = utterances.len();
        if utterances.is_empty() {
            warn!(epoch = epoch.id, "Generated script has no dialogue lines");
            return RunOutcome::EmptyScript;
        }
        debug!(epoch = epoch.id, lines = utterances.len(), "Fanning out synthesis");

        let mut batch = SynthesisBatch::spawn(&self.synthesizer, &self.cast, epoch.id, utterances);
        for slot in batch.slots.iter_mut() {
            if !self.gate.is_current(epoch.id) {
                return RunOutcome::Superseded;
            }
            let joined = tokio::select! {
                biased;
                _ = epoch.token.cancelled() => return RunOutcome::Superseded,
                joined = &mut slot.task => joined,
            };
            let asset = match joined {
                Ok(Ok(asset)) => asset,
                Ok(Err(e)) => {
                    warn!(epoch = epoch.id, index = slot.index, speaker = %slot.speaker, error = %e, "Synthesis failed, skipping line");
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(epoch = epoch.id, index = slot.index, error = %e, "Synthesis task did not complete, skipping line");
                    report.skipped += 1;
                    continue;
                }
            };
            if !self.gate.is_current(epoch.id) {
                return RunOutcome::Superseded;
            }

            match self.play(epoch, asset).await {
                Some(PlaybackOutcome::Finished) => report.played += 1,
                Some(PlaybackOutcome::Killed) => return RunOutcome::Superseded,
                None => report.playback_errors += 1,
            }
        }
        RunOutcome::Completed
    }

    /// Plays one asset and releases it. `None` means playback failed.
    async fn play(&self, epoch: &Epoch, asset: AudioAsset) -> Option<PlaybackOutcome> {
        let outcome = {
            let _playing = tokio::select! {
                biased;
                _ = epoch.token.cancelled() => return Some(PlaybackOutcome::Killed),
                guard = self.playback.lock() => guard,
            };
            if epoch.is_cancelled() {
                return Some(PlaybackOutcome::Killed);
            }
            self.sink.play(&asset, epoch.token.clone()).await
        };
        if let Err(e) = asset.release() {
            warn!(error = %e, "Failed to release audio asset");
        }
        match outcome {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(epoch = epoch.id, sink = self.sink.name(), error = %e, "Playback failed, continuing");
                None
            }
        }
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events
            && tx.send(event).is_err()
        {
            debug!("Pipeline event receiver dropped");
        }
    }
}

struct Slot {
    index: usize,
    speaker: String,
    task: JoinHandle<Result<AudioAsset>>,
}

/// In-flight synthesis for one run, in script order.
///
/// Dropping the batch aborts every task; finished-but-unconsumed assets are
/// dropped with their task output, which deletes their files.
struct SynthesisBatch {
    slots: Vec<Slot>,
}

impl SynthesisBatch {
    fn spawn(
        synthesizer: &Arc<dyn Synthesizer>,
        cast: &Cast,
        epoch: u64,
        utterances: Vec<Utterance>,
    ) -> Self {
        let slots = utterances
            .into_iter()
            .map(|utterance| {
                let request = SynthesisRequest {
                    epoch,
                    sequence_index: utterance.sequence_index,
                    voice: cast.voice_for(&utterance.speaker),
                    speaker: utterance.speaker,
                    text: utterance.text,
                };
                let speaker = request.speaker.clone();
                let synthesizer = Arc::clone(synthesizer);
                let task = tokio::spawn(async move { synthesizer.synthesize(&request).await });
                Slot {
                    index: utterance.sequence_index,
                    speaker,
                    task,
                }
            })
            .collect();
        Self { slots }
    }
}

impl Drop for SynthesisBatch {
    fn drop(&mut self) {
        for slot in &self.slots {
            slot.task.abort();
        }
    }
}
