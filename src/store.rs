//! Persisted UE configuration artifacts and id allocation
//!
//! The set of artifacts present is the source of truth for which UEs exist.
//! [`FileArtifactStore`] keeps one `ue<id>.yaml` per UE in a directory;
//! [`MemoryArtifactStore`] keeps them in a map.
//!
//! There is no reservation step: two concurrent [`next_id`] calls observe the
//! same directory and can return the same id. Callers that need unique ids
//! must serialize allocation themselves.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::ue::{artifact_file_name, parse_artifact_file_name, UeConfigArtifact, UeId};
use crate::Error;

/// Storage capability for UE configuration artifacts
pub trait ArtifactStore: Send + Sync {
    /// Ids of every artifact currently present
    fn list(&self) -> Result<BTreeSet<UeId>, Error>;

    /// Persist an artifact, replacing any previous content for the same id
    fn write(&self, artifact: &UeConfigArtifact) -> Result<(), Error>;

    /// Remove an artifact, returning whether one was present
    fn delete(&self, id: UeId) -> Result<bool, Error>;
}

/// Next free UE id: one past the highest persisted id, or 1 when none exist
pub fn next_id(store: &dyn ArtifactStore) -> Result<UeId, Error> {
    let ids = store.list()?;
    match ids.last() {
        None => Ok(UeId::FIRST),
        Some(max) => max
            .next()
            .ok_or_else(|| Error::storage(format!("ue id space exhausted at {max}"))),
    }
}

// =============================================================================
// File-backed store
// =============================================================================

/// Artifact store backed by a directory of `ue<id>.yaml` files
#[derive(Clone, Debug)]
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    /// Create a store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the artifacts
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the artifact for `id`
    pub fn path_for(&self, id: UeId) -> PathBuf {
        self.dir.join(artifact_file_name(id))
    }
}

impl ArtifactStore for FileArtifactStore {
    fn list(&self) -> Result<BTreeSet<UeId>, Error> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(dir = %self.dir.display(), "artifact directory absent, treating as empty");
                return Ok(BTreeSet::new());
            }
            Err(e) => {
                return Err(Error::storage(format!(
                    "failed to read {}: {e}",
                    self.dir.display()
                )))
            }
        };

        let mut ids = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                Error::storage(format!("failed to read {}: {e}", self.dir.display()))
            })?;
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(parse_artifact_file_name) {
                ids.insert(id);
            }
        }
        Ok(ids)
    }

    fn write(&self, artifact: &UeConfigArtifact) -> Result<(), Error> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            Error::storage(format!("failed to create {}: {e}", self.dir.display()))
        })?;
        let path = self.path_for(artifact.id);
        std::fs::write(&path, &artifact.content)
            .map_err(|e| Error::storage(format!("failed to write {}: {e}", path.display())))?;
        debug!(ue_id = %artifact.id, path = %path.display(), "wrote UE config artifact");
        Ok(())
    }

    fn delete(&self, id: UeId) -> Result<bool, Error> {
        let path = self.path_for(id);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(ue_id = %id, path = %path.display(), "removed UE config artifact");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::storage(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Artifact store kept in memory
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: Mutex<BTreeMap<UeId, String>>,
}

impl MemoryArtifactStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Content stored for `id`, if any
    pub fn get(&self, id: UeId) -> Option<String> {
        self.artifacts.lock().get(&id).cloned()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn list(&self) -> Result<BTreeSet<UeId>, Error> {
        Ok(self.artifacts.lock().keys().copied().collect())
    }

    fn write(&self, artifact: &UeConfigArtifact) -> Result<(), Error> {
        self.artifacts
            .lock()
            .insert(artifact.id, artifact.content.clone());
        Ok(())
    }

    fn delete(&self, id: UeId) -> Result<bool, Error> {
        Ok(self.artifacts.lock().remove(&id).is_some())
    }
}
