//! Build script: embeds a short commit hash for `diorama --version` logs.
//!
//! Packagers building from a tarball can set `DIORAMA_BUILD_HASH` instead.

use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=DIORAMA_BUILD_HASH");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");

    if let Some(hash) = packager_hash().or_else(git_hash) {
        println!("cargo:rustc-env=GIT_HASH={}", hash);
    }
}

fn packager_hash() -> Option<String> {
    let hash = std::env::var("DIORAMA_BUILD_HASH").ok()?;
    let hash = hash.trim();
    (!hash.is_empty()).then(|| hash.chars().take(7).collect())
}

fn git_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
