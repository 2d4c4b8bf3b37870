//! Content-addressed cache of synthesized audio
//!
//! Every distinct text maps to one `<sha256-hex>.wav` file. The key depends on
//! the text only, so changing the preset or voice does not invalidate an entry.
//! Entries are never evicted and, once written, are trusted without checking
//! them against the text again.
//!
//! There is no locking: one process handles one request. Serving concurrent
//! requests would need a per-key mutex around miss handling so that two callers
//! asking for the same text share one synthesis.

use crate::error::SpeechError;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

const AUDIO_EXTENSION: &str = "wav";

/// Stable fingerprint of a text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for `text`
    ///
    /// SHA-256 over the exact UTF-8 bytes, so keys survive restarts and
    /// platform changes.
    pub fn for_text(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Filesystem-backed audio cache
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Open the cache, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SpeechError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            SpeechError::Cache(format!("Failed to create cache directory {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the audio for `text` lives at, whether or not it exists yet
    pub fn path_for(&self, text: &str) -> PathBuf {
        let key = CacheKey::for_text(text);
        self.dir.join(format!("{}.{}", key, AUDIO_EXTENSION))
    }

    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    /// Cached audio for `text`, if any
    pub fn lookup(&self, text: &str) -> Option<PathBuf> {
        let path = self.path_for(text);
        if Self::exists(&path) {
            debug!("Cache hit: {}", path.display());
            Some(path)
        } else {
            debug!("Cache miss: {}", path.display());
            None
        }
    }

    /// Store audio for `text`
    ///
    /// `write` receives a scratch path inside the cache directory. The scratch
    /// file only becomes the entry (by rename) after `write` succeeds; on error
    /// it is removed and no entry appears.
    pub fn persist<F>(&self, text: &str, write: F) -> Result<PathBuf, SpeechError>
    where
        F: FnOnce(&Path) -> Result<(), SpeechError>,
    {
        let final_path = self.path_for(text);
        let scratch = tempfile::Builder::new()
            .prefix(".pending-")
            .suffix(&format!(".{}", AUDIO_EXTENSION))
            .tempfile_in(&self.dir)
            .map_err(|e| SpeechError::Cache(format!("Failed to create scratch file: {}", e)))?;

        write(scratch.path())?;

        scratch
            .persist(&final_path)
            .map_err(|e| SpeechError::Cache(format!("Failed to commit {}: {}", final_path.display(), e.error)))?;

        debug!("Cache entry written: {}", final_path.display());
        Ok(final_path)
    }
}
