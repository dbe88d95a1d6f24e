//! Unix socket server: one JSON command line in, one JSON response line out.

use crate::error::{DioramaError, Result};
use crate::ipc::protocol::{Command, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Handler trait for processing IPC commands.
#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, command: Command) -> Response;
}

pub struct IpcServer {
    socket_path: PathBuf,
}

impl IpcServer {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// `$XDG_RUNTIME_DIR/diorama.sock`, or `/tmp/diorama-<uid>.sock`.
    pub fn default_socket_path() -> PathBuf {
        match std::env::var("XDG_RUNTIME_DIR") {
            Ok(runtime) if !runtime.is_empty() => PathBuf::from(runtime).join("diorama.sock"),
            _ => PathBuf::from(format!("/tmp/diorama-{}.sock", crate::sys::current_uid())),
        }
    }

    /// Accepts connections until `shutdown` is cancelled, then removes the
    /// socket file.
    pub async fn serve<H>(&self, handler: H, shutdown: CancellationToken) -> Result<()>
    where
        H: CommandHandler + 'static,
    {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| DioramaError::IpcSocket {
                message: format!("Failed to remove existing socket: {}", e),
            })?;
        }

        let listener =
            UnixListener::bind(&self.socket_path).map_err(|e| DioramaError::IpcSocket {
                message: format!("Failed to bind to {}: {}", self.socket_path.display(), e),
            })?;
        debug!(socket = %self.socket_path.display(), "IPC server listening");

        let handler = Arc::new(handler);
        let result = loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                accepted = listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, _)) => {
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, handler).await {
                            warn!(error = %e, "IPC client error");
                        }
                    });
                }
                Err(e) => {
                    break Err(DioramaError::IpcConnection {
                        message: format!("Failed to accept connection: {}", e),
                    });
                }
            }
        };

        self.remove_socket();
        result
    }

    fn remove_socket(&self) {
        match std::fs::remove_file(&self.socket_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(socket = %self.socket_path.display(), error = %e, "Failed to remove socket file"),
        }
    }
}

async fn handle_client<H>(stream: UnixStream, handler: Arc<H>) -> Result<()>
where
    H: CommandHandler + ?Sized,
{
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    reader
        .read_line(&mut line)
        .await
        .map_err(|e| DioramaError::IpcConnection {
            message: format!("Failed to read from client: {}", e),
        })?;

    // A malformed request still gets an answer.
    let response = match Command::from_json(line.trim()) {
        Ok(command) => handler.handle(command).await,
        Err(e) => Response::error(format!("Failed to parse command: {}", e)),
    };

    let mut response_json = response.to_json().map_err(|e| DioramaError::IpcProtocol {
        message: format!("Failed to serialize response: {}", e),
    })?;
    response_json.push('\n');

    writer
        .write_all(response_json.as_bytes())
        .await
        .map_err(|e| DioramaError::IpcConnection {
            message: format!("Failed to write to client: {}", e),
        })?;
    writer
        .flush()
        .await
        .map_err(|e| DioramaError::IpcConnection {
            message: format!("Failed to flush writer: {}", e),
        })?;

    Ok(())
}
