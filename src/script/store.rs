//! Script store: persists generated scripts as named files.
//!
//! One file per recording, keyed by id. The script text is the only durable
//! representation of a recording; listing re-derives metadata by scanning
//! each script's comment header.

use crate::error::{RehearseError, Result};
use crate::script::header::{self, RecordingSummary};
use std::path::{Path, PathBuf};

const SCRIPT_EXTENSION: &str = "js";

/// Durable storage for generated script text.
pub trait ScriptStore: Send + Sync {
    fn write(&self, id: &str, text: &str) -> Result<()>;
    fn read(&self, id: &str) -> Result<String>;
    fn delete(&self, id: &str) -> Result<()>;
    /// File names (with extension) of every stored script.
    fn list(&self) -> Result<Vec<String>>;
}

/// Filesystem-backed store; writes are whole-file atomic replaces.
pub struct FsScriptStore {
    dir: PathBuf,
}

impl FsScriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Default location under the user's home directory.
    pub fn open_default() -> Result<Self> {
        let base = dirs::home_dir().ok_or_else(|| {
            RehearseError::Config("no home directory for script store".to_string())
        })?;
        Self::new(base.join(".rehearse").join("scripts"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, SCRIPT_EXTENSION))
    }
}

impl ScriptStore for FsScriptStore {
    fn write(&self, id: &str, text: &str) -> Result<()> {
        let path = self.path(id);
        let tmp_path = path.with_extension("js.tmp");
        std::fs::write(&tmp_path, text)?;
        std::fs::rename(&tmp_path, &path)?;
        tracing::debug!("Wrote script {:?}", path);
        Ok(())
    }

    fn read(&self, id: &str) -> Result<String> {
        Ok(std::fs::read_to_string(self.path(id))?)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let path = self.path(id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some(SCRIPT_EXTENSION) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// List stored recordings, metadata recovered from each script's header.
/// Unreadable files are skipped with a warning, not fatal.
pub fn list_recordings(store: &dyn ScriptStore) -> Result<Vec<RecordingSummary>> {
    let mut summaries = Vec::new();
    for filename in store.list()? {
        let stem = filename
            .strip_suffix(".js")
            .unwrap_or(filename.as_str())
            .to_string();
        match store.read(&stem) {
            Ok(text) => summaries.push(header::summarize(&stem, &text)),
            Err(e) => tracing::warn!("Failed to load script {}: {}", filename, e),
        }
    }
    summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(summaries)
}

/// Metadata for a single stored recording.
pub fn get_recording(store: &dyn ScriptStore, id: &str) -> Result<RecordingSummary> {
    let text = store.read(id)?;
    Ok(header::summarize(id, &text))
}

pub fn delete_recording(store: &dyn ScriptStore, id: &str) -> Result<()> {
    store.delete(id)
}
