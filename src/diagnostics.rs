//! Installation checks for `diorama check`.
//!
//! Verifies the player program, API key, serial port and asset directory
//! before a show rather than in the middle of one.

use crate::config::Config;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Result of a single check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    Ok(String),
    NotFound(String),
    Warning(String),
}

impl CheckResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, CheckResult::Ok(_))
    }
}

/// Finds `program` the way a shell would: as a path if it contains a slash,
/// otherwise on `PATH`.
pub fn find_program(program: &str) -> Option<PathBuf> {
    if program.contains('/') {
        let path = PathBuf::from(program);
        return path.is_file().then_some(path);
    }
    let search = std::env::var_os("PATH")?;
    std::env::split_paths(&search)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

fn check_player(config: &Config) -> CheckResult {
    let Some(program) = config.playback.command.first() else {
        return CheckResult::NotFound("playback.command is empty".to_string());
    };
    match find_program(program) {
        Some(path) => CheckResult::Ok(path.display().to_string()),
        None => CheckResult::NotFound(format!("'{program}' is not on PATH")),
    }
}

fn check_api_key(config: &Config) -> CheckResult {
    match config.generation.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => CheckResult::Ok("OPENAI_API_KEY is set".to_string()),
        _ => CheckResult::NotFound(
            "OPENAI_API_KEY is not set (export it or put it in .env)".to_string(),
        ),
    }
}

fn check_serial_port(port: Option<&Path>) -> CheckResult {
    let Some(port) = port else {
        return CheckResult::Warning("no serial port configured, events will be read from stdin".to_string());
    };
    match OpenOptions::new().read(true).open(port) {
        Ok(_) => CheckResult::Ok(port.display().to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::NotFound(format!("{} does not exist", port.display()))
        }
        Err(e) => CheckResult::Warning(format!("{}: {e}", port.display())),
    }
}

fn check_asset_dir(dir: &Path) -> CheckResult {
    let probe = dir.join(format!(".diorama-probe-{}", std::process::id()));
    match fs::write(&probe, b"") {
        Ok(()) => {
            if let Err(e) = fs::remove_file(&probe) {
                return CheckResult::Warning(format!("probe file not removed: {e}"));
            }
            CheckResult::Ok(dir.display().to_string())
        }
        Err(e) => CheckResult::NotFound(format!("{} is not writable: {e}", dir.display())),
    }
}

/// Runs every check. Labels are for display.
pub fn run_checks(config: &Config) -> Vec<(&'static str, CheckResult)> {
    vec![
        ("audio player", check_player(config)),
        ("api key", check_api_key(config)),
        ("serial port", check_serial_port(config.source.serial_port.as_deref())),
        ("asset directory", check_asset_dir(&config.synthesis.asset_dir())),
    ]
}

/// Prints a report and returns true when nothing is missing.
pub fn check_dependencies(config: &Config) -> bool {
    println!("Checking installation...\n");
    let mut all_ok = true;
    for (label, result) in run_checks(config) {
        match result {
            CheckResult::Ok(detail) => println!("{label}: ✓ OK ({detail})"),
            CheckResult::NotFound(detail) => {
                all_ok = false;
                println!("{label}: ✗ NOT FOUND");
                println!("  {detail}");
            }
            CheckResult::Warning(detail) => println!("{label}: ⚠ WARNING: {detail}"),
        }
    }
    println!();
    if all_ok {
        println!("All checks passed.");
    } else {
        println!("Some checks failed; `diorama simulate --dry-run` still works offline.");
    }
    all_ok
}
