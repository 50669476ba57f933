use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

static DATA_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/data");

const EMBEDDED_FILE: &str = "passages.json";

/// Presentation order for the well-known pools; anything else sorts after these.
const KNOWN_ORDER: [&str; 3] = ["easy", "medium", "hard"];

#[derive(Debug, Error)]
pub enum PassageError {
    #[error("failed to read passage data from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("passage data is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("embedded passage data is missing")]
    MissingEmbedded,
    #[error("no passages for difficulty '{0}'")]
    EmptyPool(Difficulty),
}

/// Opaque difficulty key, as found in the passage data.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Difficulty(String);

impl Difficulty {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::new("easy")
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Difficulty {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// A single record of the passage data. Fields other than `text` are ignored.
#[derive(Deserialize, Clone, Debug)]
pub struct PassageRecord {
    pub text: String,
}

/// Passages grouped by difficulty.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(transparent)]
pub struct PassageBook {
    pools: BTreeMap<Difficulty, Vec<PassageRecord>>,
}

impl PassageBook {
    /// Parse the `{ "<difficulty>": [ { "text": ... }, ... ] }` document.
    pub fn from_json(json: &str) -> Result<Self, PassageError> {
        let book: PassageBook = serde_json::from_str(json)?;
        log::info!(
            "loaded passages: {}",
            book.pools
                .iter()
                .map(|(d, pool)| format!("{d}={}", pool.len()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(book)
    }

    /// The passage set compiled into the binary.
    pub fn embedded() -> Result<Self, PassageError> {
        let file = DATA_DIR
            .get_file(EMBEDDED_FILE)
            .ok_or(PassageError::MissingEmbedded)?;
        let json = file.contents_utf8().ok_or(PassageError::MissingEmbedded)?;
        Self::from_json(json)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PassageError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| PassageError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Difficulty keys: easy, medium, hard first, the rest alphabetically.
    pub fn difficulties(&self) -> Vec<Difficulty> {
        let mut keys: Vec<Difficulty> = self.pools.keys().cloned().collect();
        keys.sort_by_key(|d| {
            let rank = KNOWN_ORDER
                .iter()
                .position(|k| *k == d.as_str())
                .unwrap_or(KNOWN_ORDER.len());
            (rank, d.clone())
        });
        keys
    }

    pub fn pool_len(&self, difficulty: &Difficulty) -> usize {
        self.pools.get(difficulty).map_or(0, Vec::len)
    }

    /// Uniformly pick a passage from the pool for `difficulty`.
    pub fn pick_passage<R: Rng + ?Sized>(
        &self,
        difficulty: &Difficulty,
        rng: &mut R,
    ) -> Result<String, PassageError> {
        self.pools
            .get(difficulty)
            .and_then(|pool| pool.choose(rng))
            .filter(|record| !record.text.is_empty())
            .map(|record| record.text.clone())
            .ok_or_else(|| PassageError::EmptyPool(difficulty.clone()))
    }
}
