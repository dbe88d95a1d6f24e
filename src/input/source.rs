//! Reader-board line source.
//!
//! The board prints one line per tag read, e.g. `(Reader 3, 53 A0 94 65 21 00 01)`.
//! Lines are decoded, resolved against the cast and forwarded to the
//! orchestrator until EOF, shutdown, or the orchestrator going away.

use crate::cast::Cast;
use crate::error::{DioramaError, Result};
use crate::event::parse_reader_line;
use crate::session::OrchestratorHandle;
use std::io::{self, BufRead};
use std::path::Path;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Lines read ahead of the consumer.
const LINE_BUFFER: usize = 64;

/// Counters reported when a source ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub lines: usize,
    pub readings: usize,
    pub unknown: usize,
    pub forwarded: usize,
}

/// Lines from a serial device or stdin, read on a dedicated thread.
///
/// A read on an idle tty or pipe cannot be interrupted, and the runtime waits
/// for its blocking pool on exit. A plain thread is never joined, so dropping
/// the reader lets the process exit; the thread ends after its next line.
#[derive(Debug)]
pub struct LineReader {
    rx: mpsc::Receiver<io::Result<String>>,
}

impl LineReader {
    /// Starts a thread named `diorama-{name}` reading `reader` line by line.
    pub fn spawn<R>(name: &str, reader: R) -> Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        std::thread::Builder::new()
            .name(format!("diorama-{name}"))
            .spawn(move || {
                for line in reader.lines() {
                    let failed = line.is_err();
                    if tx.blocking_send(line).is_err() || failed {
                        break;
                    }
                }
            })?;
        Ok(Self { rx })
    }

    pub fn stdin() -> Result<Self> {
        Self::spawn("stdin", io::BufReader::new(io::stdin()))
    }

    /// The next line without its terminator, `None` at EOF. Cancel-safe.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.rx.recv().await.transpose()
    }
}

/// Opens the serial device at `port` (already configured, e.g. with `stty`),
/// or stdin when `port` is `None`.
pub async fn open(port: Option<&Path>) -> Result<LineReader> {
    match port {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| DioramaError::EventSource {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?
                .into_std()
                .await;
            info!(port = %path.display(), "Reading tag events from serial port");
            LineReader::spawn("serial", io::BufReader::new(file))
        }
        None => {
            info!("Reading tag events from stdin");
            LineReader::stdin()
        }
    }
}

/// Forwards every resolvable reading from `reader` to `handle`.
pub async fn forward_readings(
    mut lines: LineReader,
    cast: &Cast,
    handle: &OrchestratorHandle,
    shutdown: CancellationToken,
) -> Result<SourceStats> {
    let mut stats = SourceStats::default();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            debug!("Event source reached EOF");
            break;
        };
        stats.lines += 1;

        let line = line.trim_end_matches('\r');
        let Some(reading) = parse_reader_line(line) else {
            trace!(line, "Ignoring non-reading line");
            continue;
        };
        stats.readings += 1;

        let Some(presence) = cast.resolve(&reading) else {
            debug!(reader = %reading.reader_id, tag = %reading.tag_uid, "Unknown reader or tag");
            stats.unknown += 1;
            continue;
        };

        info!(station = %presence.station, participant = %presence.participant, "Tag detected");
        match handle.event(presence).await {
            Ok(action) => {
                debug!(%action, "Event applied");
                stats.forwarded += 1;
            }
            Err(DioramaError::OrchestratorStopped) => {
                warn!("Orchestrator stopped, closing event source");
                break;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{MockSynthesizer, RecordingSink};
    use crate::pipeline::Pipeline;
    use crate::script::MockGenerator;
    use crate::session::{self, SessionConfig};
    use std::io::Read;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// A reader that blocks until its sender is dropped, like an idle tty.
    struct Idle(std::sync::mpsc::Receiver<()>);

    impl Read for Idle {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    fn lines(text: &'static str) -> LineReader {
        LineReader::spawn("test", text.as_bytes()).unwrap()
    }

    fn orchestrator() -> (OrchestratorHandle, tokio::task::JoinHandle<()>) {
        let pipeline = Pipeline::new(
            Arc::new(MockGenerator::new()),
            Arc::new(MockSynthesizer::new()),
            Arc::new(RecordingSink::new(Duration::ZERO)),
            Arc::new(Cast::default()),
        );
        session::spawn(pipeline, SessionConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn forwards_known_readings_and_counts_the_rest() {
        let (handle, _task) = orchestrator();
        let input = lines(
            "boot banner\r\n\
            (Reader 3, 53 A0 94 65 21 00 01)\r\n\
            (Reader 9, 53 A0 94 65 21 00 01)\n\
            (Reader 3, 53 B5 11 60 21 00 01)\n",
        );

        let stats = forward_readings(input, &Cast::default(), &handle, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            stats,
            SourceStats {
                lines: 4,
                readings: 3,
                unknown: 1,
                forwarded: 2,
            }
        );
        let status = handle.status().await.unwrap();
        assert_eq!(status.station.as_deref(), Some("Desk"));
        assert_eq!(status.participants, vec!["Andrea", "Book"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_orchestrator_is_gone() {
        let (handle, task) = orchestrator();
        handle.shutdown().await.unwrap();
        task.await.unwrap();

        let input = lines("(Reader 3, 53 A0 94 65 21 00 01)\n(Reader 3, 53 B5 11 60 21 00 01)\n");
        let stats = forward_readings(input, &Cast::default(), &handle, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(stats.readings, 1);
        assert_eq!(stats.forwarded, 0);
    }

    #[tokio::test]
    async fn shutdown_does_not_wait_for_an_idle_reader() {
        let (handle, _task) = orchestrator();
        let (wake, idle) = std::sync::mpsc::channel();
        let reader = LineReader::spawn("idle", io::BufReader::new(Idle(idle))).unwrap();
        let shutdown = CancellationToken::new();

        let started = Instant::now();
        let forward = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                forward_readings(reader, &Cast::default(), &handle, shutdown).await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        let stats = forward.await.unwrap().unwrap();
        assert_eq!(stats, SourceStats::default());
        assert!(started.elapsed() < Duration::from_secs(1));
        // Let the reader thread see EOF and exit
        drop(wake);
    }

    #[tokio::test]
    async fn reader_thread_reports_eof() {
        let mut reader = lines("one\r\ntwo");
        assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("one"));
        assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("two"));
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_device_is_event_source_error() {
        let result = open(Some(Path::new("/dev/diorama-no-such-port"))).await;
        assert!(matches!(result, Err(DioramaError::EventSource { .. })));
    }
}
