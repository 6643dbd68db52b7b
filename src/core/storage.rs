//=========================================================================
// Key-Value Storage
//=========================================================================
//
// Small persistent store for integer preferences and progress counters.
//
// Two backends:
//   MemoryStore   - volatile, for tests and headless runs
//   RonFileStore  - RON document on disk, written atomically on save()
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

//=== StoreError ==========================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access store file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store file '{path}' is not valid RON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("failed to serialize store contents: {0}")]
    Serialize(#[from] ron::Error),
}

//=== KeyValueStore Trait =================================================

/// Integer key-value persistence.
pub trait KeyValueStore {
    /// Value stored under `key`, or `default` when absent.
    fn get_int(&self, key: &str, default: i64) -> i64;

    fn set_int(&mut self, key: &str, value: i64);

    fn has_key(&self, key: &str) -> bool;

    /// Flushes pending writes to the backing medium.
    fn save(&mut self) -> Result<(), StoreError>;
}

//=== MemoryStore =========================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, i64>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `save` has been called.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl KeyValueStore for MemoryStore {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
    }

    fn has_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.saves += 1;
        Ok(())
    }
}

//=== RonFileStore ========================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    ints: BTreeMap<String, i64>,
}

/// File-backed store. Writes go to memory until [`KeyValueStore::save`].
#[derive(Debug)]
pub struct RonFileStore {
    path: PathBuf,
    document: StoreDocument,
    dirty: bool,
}

impl RonFileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let document = match fs::read_to_string(&path) {
            Ok(text) => ron::from_str(&text).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("[Storage] No store at {}, starting empty", path.display());
                StoreDocument::default()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        Ok(Self {
            path,
            document,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` when there are writes not yet saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl KeyValueStore for RonFileStore {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.document.ints.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i64) {
        if self.document.ints.insert(key.to_string(), value) != Some(value) {
            self.dirty = true;
        }
    }

    fn has_key(&self, key: &str) -> bool {
        self.document.ints.contains_key(key)
    }

    fn save(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }

        let text = ron::ser::to_string_pretty(&self.document, ron::ser::PrettyConfig::default())?;
        write_atomic(&self.path, &text).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        self.dirty = false;
        info!("[Storage] Saved {} keys to {}", self.document.ints.len(), self.path.display());
        Ok(())
    }
}

//=== Atomic Write ========================================================

fn write_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("store");
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    fs::write(&tmp_path, text)?;
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_falls_back_to_default() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get_int("MaxReachedFloor", 1), 1);
        assert!(!store.has_key("MaxReachedFloor"));

        store.set_int("MaxReachedFloor", 7);
        assert_eq!(store.get_int("MaxReachedFloor", 1), 7);
        store.save().unwrap();
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saves").join("progress.ron");

        let mut store = RonFileStore::open(&path).unwrap();
        assert_eq!(store.get_int("MaxReachedFloor", 1), 1);
        store.set_int("MaxReachedFloor", 12);
        assert!(store.is_dirty());
        store.save().unwrap();
        assert!(!store.is_dirty());
        assert!(!path.with_file_name("progress.ron.tmp").exists());

        let reopened = RonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get_int("MaxReachedFloor", 1), 12);
    }

    #[test]
    fn unchanged_value_does_not_dirty_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RonFileStore::open(dir.path().join("s.ron")).unwrap();
        store.set_int("a", 3);
        store.save().unwrap();
        store.set_int("a", 3);
        assert!(!store.is_dirty());
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        fs::write(&path, "(ints: {\"a\": ").unwrap();

        let err = RonFileStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }
}
