//! One JSON file per architecture under a directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use skyplan_core::{Error, Result};
use tokio::fs;
use tracing::{debug, warn};

use crate::architecture::Architecture;
use crate::settings::EditorSettings;
use crate::store::ArchitectureStore;

const EXTENSION: &str = ".json";

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_settings(settings: &EditorSettings) -> Self {
        Self::new(settings.store_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}{}", id, EXTENSION))
    }
}

/// Ids become file names, so only a conservative character set is allowed.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn io_failure(action: &str, path: &Path, err: std::io::Error) -> Error {
    Error::PersistenceFailure(format!("{} {}: {}", action, path.display(), err))
}

async fn read_record(path: &Path) -> Result<Option<Architecture>> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_failure("cannot read", path, e)),
    };
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|e| Error::PersistenceFailure(format!("corrupt {}: {}", path.display(), e)))
}

#[async_trait]
impl ArchitectureStore for FileStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Architecture>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_failure("cannot list", &self.dir, e)),
        };
        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_failure("cannot list", &self.dir, e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || !name.ends_with(EXTENSION) {
                continue;
            }
            // A single bad file must not hide the rest of the list.
            match read_record(&entry.path()).await {
                Ok(Some(record)) if record.owner_id == owner_id => records.push(record),
                Ok(_) => {}
                Err(e) => warn!("skipping {}: {}", name, e),
            }
        }
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Option<Architecture>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        read_record(&self.path_for(id)).await
    }

    /// Atomic write (temp file + rename) so a crash mid-save never leaves a
    /// truncated record behind.
    async fn put(&self, architecture: &Architecture) -> Result<()> {
        let id = &architecture.id;
        if !is_valid_id(id) {
            return Err(Error::Validation(format!("'{}' is not a valid architecture id", id)));
        }
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_failure("cannot create", &self.dir, e))?;
        let json = serde_json::to_vec_pretty(architecture)
            .map_err(|e| Error::PersistenceFailure(format!("cannot serialize '{}': {}", id, e)))?;
        let tmp = self.dir.join(format!(".{}{}.tmp", id, EXTENSION));
        let path = self.path_for(id);
        fs::write(&tmp, json)
            .await
            .map_err(|e| io_failure("cannot write", &tmp, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_failure("cannot write", &path, e))?;
        debug!("wrote {}", path.display());
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        if !is_valid_id(id) {
            return Ok(());
        }
        let path = self.path_for(id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_failure("cannot delete", &path, e)),
        }
    }
}
