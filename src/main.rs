use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use diorama::app::{build_pipeline, run_simulation};
use diorama::cli::{Cli, Commands, ConfigAction, SessionArgs};
use diorama::config::Config;
use diorama::daemon::{DaemonOptions, run_daemon};
use diorama::diagnostics::check_dependencies;
use diorama::ipc::client::send_command;
use diorama::ipc::protocol::{Command, Response};
use diorama::ipc::server::IpcServer;
use diorama::output::render_response;
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the key may come from the real environment.
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("diorama: ignoring .env: {e}");
    }

    let cli = Cli::parse();
    diorama::logging::init(cli.verbose, cli.quiet);
    tracing::debug!(version = %diorama::version_string(), "diorama starting");

    match cli.command {
        Commands::Run {
            session,
            port,
            ipc_only,
            socket,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            apply_session_args(&mut config, &session);
            if port.is_some() {
                config.source.serial_port = port;
            }
            config.validate()?;
            let pipeline = build_pipeline(&config, session.dry_run)?;
            run_daemon(
                config,
                pipeline,
                DaemonOptions {
                    socket_path: socket,
                    ipc_only,
                },
            )
            .await?;
        }
        Commands::Simulate { session } => {
            let mut config = load_config(cli.config.as_deref())?;
            apply_session_args(&mut config, &session);
            config.validate()?;
            run_simulation(config, session.dry_run, std::io::stdout().is_terminal()).await?;
        }
        Commands::Send {
            station,
            participant,
            socket,
        } => {
            handle_ipc_command(
                socket,
                Command::Event {
                    station,
                    participant,
                },
            )
            .await?;
        }
        Commands::Reset { socket } => handle_ipc_command(socket, Command::Reset).await?,
        Commands::Status { socket } => handle_ipc_command(socket, Command::Status).await?,
        Commands::Shutdown { socket } => handle_ipc_command(socket, Command::Shutdown).await?,
        Commands::Check => {
            let config = load_config(cli.config.as_deref())?;
            if !check_dependencies(&config) {
                std::process::exit(1);
            }
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "diorama",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config), which must exist
/// 2. Default config path (~/.config/diorama/config.toml)
/// 3. Built-in defaults
///
/// Environment overrides are applied on top in every case.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()?)?,
    };
    Ok(config.with_env_overrides())
}

fn apply_session_args(config: &mut Config, args: &SessionArgs) {
    if let Some(buffer) = args.buffer {
        config.session.buffer_ms = duration_ms(buffer);
    }
    if let Some(window) = args.window {
        config.session.window_ms = duration_ms(window);
    }
}

fn duration_ms(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Send one command to the daemon and print the reply.
async fn handle_ipc_command(socket: Option<PathBuf>, command: Command) -> Result<()> {
    let socket_path = socket.unwrap_or_else(IpcServer::default_socket_path);
    let response = send_command(&socket_path, &command).await?;
    let color = std::io::stdout().is_terminal();

    match &response {
        Response::Error { message } => {
            if color {
                eprintln!("{} {}", "Error:".red().bold(), message);
            } else {
                eprintln!("Error: {message}");
            }
            std::process::exit(1);
        }
        other => println!("{}", render_response(other, color)),
    }
    Ok(())
}

fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            let path = match custom_path {
                Some(path) => path.to_path_buf(),
                None => Config::default_path()?,
            };
            let status = if path.exists() { "" } else { " (not created yet)" };
            println!("{}{}", path.display(), status.dimmed());
        }
        ConfigAction::Dump => {
            println!("# diorama configuration");
            println!("# Copy to {} and edit.", Config::default_path()?.display());
            println!("# OPENAI_API_KEY is read from the environment or .env, never from this file.");
            println!();
            print!("{}", Config::default().to_toml()?);
        }
    }
    Ok(())
}
