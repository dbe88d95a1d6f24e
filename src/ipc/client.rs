//! IPC client for sending commands to the daemon.

use crate::error::{DioramaError, Result};
use crate::ipc::protocol::{Command, Response};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Sends one command and waits for the daemon's reply.
///
/// # Errors
/// `IpcConnection` if the daemon is unreachable, `IpcProtocol` if either side
/// of the exchange is not valid JSON.
pub async fn send_command(socket_path: &Path, command: &Command) -> Result<Response> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| DioramaError::IpcConnection {
            message: format!(
                "Failed to connect to daemon at {}: {} (is `diorama run` running?)",
                socket_path.display(),
                e
            ),
        })?;

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let mut command_json = command.to_json().map_err(|e| DioramaError::IpcProtocol {
        message: format!("Failed to serialize command: {}", e),
    })?;
    command_json.push('\n');

    writer
        .write_all(command_json.as_bytes())
        .await
        .map_err(|e| DioramaError::IpcConnection {
            message: format!("Failed to write command: {}", e),
        })?;
    writer
        .flush()
        .await
        .map_err(|e| DioramaError::IpcConnection {
            message: format!("Failed to flush writer: {}", e),
        })?;

    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .await
        .map_err(|e| DioramaError::IpcConnection {
            message: format!("Failed to read response: {}", e),
        })?;

    Response::from_json(response_line.trim()).map_err(|e| DioramaError::IpcProtocol {
        message: format!("Failed to deserialize response: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::server::{CommandHandler, IpcServer};
    use crate::session::Action;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    struct FixedHandler;

    #[async_trait::async_trait]
    impl CommandHandler for FixedHandler {
        async fn handle(&self, command: Command) -> Response {
            match command {
                Command::Event { participant, .. } if participant == "Ghost" => {
                    Response::error("unknown participant")
                }
                Command::Event { .. } => Response::Action {
                    action: Action::JoinBuffering,
                },
                _ => Response::Ok,
            }
        }
    }

    #[tokio::test]
    async fn round_trips_through_server() {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("client.sock");
        let shutdown = CancellationToken::new();

        let server = IpcServer::new(socket_path.clone());
        let token = shutdown.clone();
        let task = tokio::spawn(async move { server.serve(FixedHandler, token).await });
        for _ in 0..100 {
            if socket_path.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let event = Command::Event {
            station: "Desk".to_string(),
            participant: "Book".to_string(),
        };
        assert_eq!(
            send_command(&socket_path, &event).await.unwrap(),
            Response::Action {
                action: Action::JoinBuffering
            }
        );

        let ghost = Command::Event {
            station: "Desk".to_string(),
            participant: "Ghost".to_string(),
        };
        assert!(matches!(
            send_command(&socket_path, &ghost).await.unwrap(),
            Response::Error { .. }
        ));

        shutdown.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn missing_daemon_is_connection_error() {
        let dir = TempDir::new().unwrap();
        let result = send_command(&dir.path().join("nobody.sock"), &Command::Status).await;
        assert!(matches!(result, Err(DioramaError::IpcConnection { .. })));
    }
}
