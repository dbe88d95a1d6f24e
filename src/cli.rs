//! Command-line interface for diorama
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Spoken multi-character scenes driven by RFID presence events
#[derive(Parser, Debug)]
#[command(name = "diorama", version, about = "Spoken multi-character scenes driven by RFID presence events")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Session timing and backend overrides shared by `run` and `simulate`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Buffer window after the first tag (default: 2s). Examples: 500ms, 2s
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub buffer: Option<Duration>,

    /// How long a scene stays interruptible (default: 35s). Examples: 35s, 1m
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub window: Option<Duration>,

    /// Canned scripts and silent playback; no API key needed
    #[arg(long)]
    pub dry_run: bool,
}

/// Parse a duration: bare numbers are milliseconds, anything else goes
/// through `humantime` (`2s`, `1m30s`, `750ms`).
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let duration = match s.parse::<u64>() {
        Ok(ms) => Duration::from_millis(ms),
        Err(_) => humantime::parse_duration(s).map_err(|e| e.to_string())?,
    };
    if duration.is_zero() {
        return Err("duration must be greater than zero".to_string());
    }
    Ok(duration)
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the installation: read the reader board and serve IPC
    Run {
        #[command(flatten)]
        session: SessionArgs,

        /// Serial device the reader board is attached to (default: stdin)
        #[arg(long, value_name = "DEVICE")]
        port: Option<PathBuf>,

        /// Ignore the board and stdin; accept events over IPC only
        #[arg(long, conflicts_with = "port")]
        ipc_only: bool,

        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/diorama.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Drive a session from the keyboard (1-4 place objects, r resets, q quits)
    Simulate {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Send a presence event to the running daemon
    Send {
        /// Station name (e.g., Desk)
        station: String,
        /// Participant name (e.g., Book)
        participant: String,

        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/diorama.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Stop audio and clear the session on the running daemon
    Reset {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/diorama.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Show the running daemon's session
    Status {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/diorama.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Ask the running daemon to exit
    Shutdown {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/diorama.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Check player, API key, serial port and asset directory
    Check,

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the default configuration file path
    Path,
    /// Print the default configuration template
    Dump,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["diorama", "run"]).unwrap();
        match cli.command {
            Commands::Run {
                session,
                port,
                ipc_only,
                socket,
            } => {
                assert!(session.buffer.is_none());
                assert!(session.window.is_none());
                assert!(!session.dry_run);
                assert!(port.is_none());
                assert!(!ipc_only);
                assert!(socket.is_none());
            }
            other => panic!("Expected Run command, got {:?}", other),
        }
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_verbose_double() {
        let cli = Cli::try_parse_from(["diorama", "-vv", "check"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Check));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["diorama", "status", "-q", "--config", "/tmp/d.toml"]).unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/d.toml")));
    }

    #[test]
    fn test_parse_durations() {
        let cli = Cli::try_parse_from([
            "diorama", "simulate", "--buffer", "500ms", "--window", "1m", "--dry-run",
        ])
        .unwrap();
        let Commands::Simulate { session } = cli.command else {
            panic!("Expected Simulate command");
        };
        assert_eq!(session.buffer, Some(Duration::from_millis(500)));
        assert_eq!(session.window, Some(Duration::from_secs(60)));
        assert!(session.dry_run);
    }

    #[test]
    fn test_bare_number_is_milliseconds() {
        assert_eq!(parse_duration("2000"), Ok(Duration::from_secs(2)));
        assert_eq!(parse_duration(" 35s "), Ok(Duration::from_secs(35)));
    }

    #[test]
    fn test_zero_and_garbage_durations_rejected() {
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_parse_send() {
        let cli = Cli::try_parse_from(["diorama", "send", "Desk", "Book"]).unwrap();
        match cli.command {
            Commands::Send {
                station,
                participant,
                socket,
            } => {
                assert_eq!(station, "Desk");
                assert_eq!(participant, "Book");
                assert!(socket.is_none());
            }
            other => panic!("Expected Send command, got {:?}", other),
        }
    }

    #[test]
    fn test_port_conflicts_with_ipc_only() {
        assert!(
            Cli::try_parse_from(["diorama", "run", "--port", "/dev/ttyUSB0", "--ipc-only"])
                .is_err()
        );
    }

    #[test]
    fn test_config_actions() {
        for (arg, expected) in [("show", "Show"), ("path", "Path"), ("dump", "Dump")] {
            let cli = Cli::try_parse_from(["diorama", "config", arg]).unwrap();
            let Commands::Config { action } = cli.command else {
                panic!("Expected Config command");
            };
            assert_eq!(format!("{:?}", action), expected);
        }
    }

    #[test]
    fn test_completions_shell() {
        let cli = Cli::try_parse_from(["diorama", "completions", "bash"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Completions { shell: Shell::Bash }
        ));
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["diorama"]).is_err());
    }
}
