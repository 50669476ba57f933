use serde_json::{Map, Value};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::app_dirs::AppDirs;

/// The single well-known key the personal best lives under.
pub const BEST_SCORE_KEY: &str = "typing_pb";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not determine a state directory")]
    NoStateDir,
    #[error("failed to write best score: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode best score: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable home of the personal best WPM.
pub trait ScoreStore {
    /// Stored best, or 0 when absent or not a valid non-negative integer.
    fn load(&self) -> u32;
    /// Overwrite the stored best unconditionally.
    fn save(&self, value: u32) -> Result<(), StoreError>;
}

/// Keeps `{ "typing_pb": <n> }` in a JSON file.
#[derive(Debug, Clone)]
pub struct FileScoreStore {
    path: PathBuf,
}

impl FileScoreStore {
    pub fn new() -> Result<Self, StoreError> {
        let path = AppDirs::scores_path().ok_or(StoreError::NoStateDir)?;
        Ok(Self { path })
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Option<Map<String, Value>> {
        let bytes = fs::read(&self.path).ok()?;
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) | Err(_) => {
                log::debug!("ignoring unreadable score file {}", self.path.display());
                None
            }
        }
    }
}

impl ScoreStore for FileScoreStore {
    fn load(&self) -> u32 {
        self.read_document()
            .and_then(|doc| doc.get(BEST_SCORE_KEY).and_then(Value::as_u64))
            .and_then(|best| u32::try_from(best).ok())
            .unwrap_or(0)
    }

    fn save(&self, value: u32) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut doc = Map::new();
        doc.insert(BEST_SCORE_KEY.to_string(), Value::from(value));
        let data = serde_json::to_vec_pretty(&Value::Object(doc))?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

/// In-memory store for tests and for running without a writable state dir.
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    best: Cell<Option<u32>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_best(best: u32) -> Self {
        Self {
            best: Cell::new(Some(best)),
        }
    }
}

impl ScoreStore for MemoryScoreStore {
    fn load(&self) -> u32 {
        self.best.get().unwrap_or(0)
    }

    fn save(&self, value: u32) -> Result<(), StoreError> {
        self.best.set(Some(value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_without_file_is_zero() {
        let dir = tempdir().unwrap();
        let store = FileScoreStore::with_path(dir.path().join("scores.json"));
        assert_eq!(store.load(), 0);
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let store = FileScoreStore::with_path(dir.path().join("nested").join("scores.json"));
        store.save(45).unwrap();
        assert_eq!(store.load(), 45);

        let reopened = FileScoreStore::with_path(store.path());
        assert_eq!(reopened.load(), 45);
    }

    #[test]
    fn save_overwrites_unconditionally() {
        let dir = tempdir().unwrap();
        let store = FileScoreStore::with_path(dir.path().join("scores.json"));
        store.save(80).unwrap();
        store.save(12).unwrap();
        assert_eq!(store.load(), 12);
    }

    #[test]
    fn invalid_values_load_as_zero() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.json");
        let store = FileScoreStore::with_path(&path);

        for contents in [
            r#"{ "typing_pb": -5 }"#,
            r#"{ "typing_pb": "fast" }"#,
            r#"{ "typing_pb": 12.5 }"#,
            r#"{ "typing_pb": 99999999999 }"#,
            r#"{ "other": 10 }"#,
            r#"[45]"#,
            "not json at all",
            "",
        ] {
            fs::write(&path, contents).unwrap();
            assert_eq!(store.load(), 0, "contents: {contents}");
        }
    }

    #[test]
    fn memory_store() {
        let store = MemoryScoreStore::new();
        assert_eq!(store.load(), 0);
        store.save(45).unwrap();
        assert_eq!(store.load(), 45);
        assert_eq!(MemoryScoreStore::with_best(7).load(), 7);
    }
}
