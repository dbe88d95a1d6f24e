//! Daemon mode: session orchestrator, reader-board source and IPC server in
//! one process, running until a signal or a `shutdown` command.

pub mod handler;

use crate::cast::Cast;
use crate::config::Config;
use crate::error::{DioramaError, Result};
use crate::input;
use crate::ipc::server::IpcServer;
use crate::output;
use crate::pipeline::Pipeline;
use crate::session::{self, OrchestratorHandle};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Knobs that come from the command line rather than the config file.
#[derive(Debug, Clone, Default)]
pub struct DaemonOptions {
    /// Socket path; defaults to [`IpcServer::default_socket_path`].
    pub socket_path: Option<PathBuf>,
    /// Do not read the serial port or stdin; events arrive over IPC only.
    pub ipc_only: bool,
}

/// Run the daemon until SIGINT, SIGTERM or an IPC `shutdown`.
///
/// # Returns
/// Ok(()) on graceful shutdown, error if the event source or socket could not
/// be opened.
pub async fn run_daemon(config: Config, pipeline: Pipeline, options: DaemonOptions) -> Result<()> {
    let cast = Arc::new(config.cast.clone());
    let shutdown = CancellationToken::new();

    let source = if options.ipc_only {
        None
    } else {
        Some(input::open(config.source.serial_port.as_deref()).await?)
    };

    let (handle, mut orchestrator) = session::spawn(pipeline, config.session.to_session_config());

    let server = IpcServer::new(
        options
            .socket_path
            .unwrap_or_else(IpcServer::default_socket_path),
    );
    info!(socket = %server.socket_path().display(), "IPC server listening");
    let handler = handler::DaemonCommandHandler::new(handle.clone(), Arc::clone(&cast), shutdown.clone());
    let server_token = shutdown.clone();
    let server_task = tokio::spawn(async move { server.serve(handler, server_token).await });

    let source_task = source.map(|reader| spawn_source(reader, cast, handle.clone(), shutdown.clone()));

    info!("Daemon ready");

    let mut orchestrator_done = false;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down"),
        res = wait_for_sigterm() => {
            if let Err(e) = res {
                error!(error = %e, "Error setting up signal handler");
            }
            info!("Received SIGTERM, shutting down");
        }
        _ = shutdown.cancelled() => {}
        res = &mut orchestrator => {
            orchestrator_done = true;
            if let Err(e) = res {
                error!(error = %e, "Session orchestrator failed");
            }
        }
    }

    shutdown.cancel();
    handle.shutdown().await?;

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "IPC server stopped with an error"),
        Err(e) => error!(error = %e, "IPC server task failed"),
    }
    if let Some(task) = source_task
        && let Err(e) = task.await
    {
        error!(error = %e, "Event source task failed");
    }
    if !orchestrator_done && let Err(e) = orchestrator.await {
        error!(error = %e, "Session orchestrator failed");
    }

    info!("Daemon stopped");
    Ok(())
}

fn spawn_source(
    reader: input::LineReader,
    cast: Arc<Cast>,
    handle: OrchestratorHandle,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match input::forward_readings(reader, &cast, &handle, shutdown).await {
            // EOF on the board does not stop the daemon; IPC keeps working.
            Ok(stats) => info!("Event source closed: {}", output::render_source_stats(&stats)),
            Err(e) => error!(error = %e, "Event source failed"),
        }
    })
}

/// Wait for SIGTERM (sent by service managers).
#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| DioramaError::Other(format!("Failed to register SIGTERM handler: {}", e)))?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    // Ctrl+C still works
    std::future::pending::<()>().await
}
