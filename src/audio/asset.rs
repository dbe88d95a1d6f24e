//! Synthesized audio owned by the pipeline until it has been played.
//!
//! File-backed assets delete their file when released or dropped, so an asset
//! discarded by a superseded run never outlives it.

use crate::defaults;
use crate::error::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Where the audio bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetData {
    File(PathBuf),
    Memory(Vec<u8>),
}

/// Audio for one utterance of one generation run.
#[derive(Debug)]
pub struct AudioAsset {
    epoch: u64,
    index: usize,
    data: AssetData,
    released: bool,
}

impl AudioAsset {
    pub fn in_memory(epoch: u64, index: usize, bytes: Vec<u8>) -> Self {
        Self {
            epoch,
            index,
            data: AssetData::Memory(bytes),
            released: false,
        }
    }

    /// Takes ownership of `path`: the file is removed on release or drop,
    /// whether or not it was ever written.
    pub fn file(epoch: u64, index: usize, path: PathBuf) -> Self {
        Self {
            epoch,
            index,
            data: AssetData::File(path),
            released: false,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn data(&self) -> &AssetData {
        &self.data
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.data {
            AssetData::File(path) => Some(path),
            AssetData::Memory(_) => None,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.data {
            AssetData::Memory(bytes) => Some(bytes),
            AssetData::File(_) => None,
        }
    }

    /// Short human-readable name: file name, or the text of an in-memory asset.
    pub fn label(&self) -> String {
        match &self.data {
            AssetData::File(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            AssetData::Memory(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Deletes the backing file now, reporting failures. Dropping does the
    /// same but can only log.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        if let AssetData::File(path) = &self.data {
            remove_if_present(path)?;
        }
        Ok(())
    }
}

impl Drop for AudioAsset {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let AssetData::File(path) = &self.data
            && let Err(e) = remove_if_present(path)
        {
            warn!(path = %path.display(), error = %e, "failed to delete discarded audio asset");
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Allocates unique file paths for synthesized audio.
#[derive(Debug, Clone)]
pub struct AssetStore {
    dir: PathBuf,
    extension: String,
    /// Distinguishes this process from earlier runs sharing the directory.
    run_tag: String,
}

impl AssetStore {
    pub fn new(dir: impl Into<PathBuf>, extension: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or_default();
        Self {
            dir: dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
            run_tag: format!("{}-{:08x}", std::process::id(), nanos),
        }
    }

    /// Store in the system temp directory.
    pub fn temp(extension: &str) -> Self {
        Self::new(std::env::temp_dir(), extension)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// An empty file-backed asset for `(epoch, index)`; the caller writes it.
    pub fn reserve(&self, epoch: u64, index: usize) -> AudioAsset {
        let name = format!(
            "{}_{}_{}_{}.{}",
            defaults::ASSET_PREFIX,
            self.run_tag,
            epoch,
            index,
            self.extension
        );
        AudioAsset::file(epoch, index, self.dir.join(name))
    }

    /// Removes asset files left behind by earlier processes (e.g. after a
    /// crash). Returns how many were deleted.
    pub fn sweep(&self) -> Result<usize> {
        let prefix = format!("{}_", defaults::ASSET_PREFIX);
        let suffix = format!(".{}", self.extension);
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix)
                && name.ends_with(&suffix)
                && !name.contains(&self.run_tag)
                && entry.file_type()?.is_file()
            {
                remove_if_present(&entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
