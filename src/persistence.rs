//! # Persistence
//!
//! Key/value storage for board state. Writes are fire-and-forget and never
//! gate what in-process readers see; reads that fail for any reason return
//! `None` so the caller falls back to catalog defaults.
//!
//! Every blob is a versioned JSON envelope:
//!
//! ```json
//! { "version": 1, "data": [ ... ] }
//! ```
//!
//! A blob whose version differs from [`SNAPSHOT_VERSION`] is treated exactly
//! like a corrupt one.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const SNAPSHOT_VERSION: u32 = 1;

pub const NODES_KEY: &str = "nodes";
pub const WIRES_KEY: &str = "wires";
pub const COMPLETION_KEY: &str = "completion";

pub trait Persistence {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, blob: &str);
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    data: T,
}

/// Wrap `data` in a versioned envelope.
pub fn encode<T: Serialize>(data: &T) -> Option<String> {
    let envelope = Envelope {
        version: SNAPSHOT_VERSION,
        data,
    };
    match serde_json::to_string(&envelope) {
        Ok(blob) => Some(blob),
        Err(e) => {
            log::warn!("Failed to encode snapshot: {}", e);
            None
        }
    }
}

/// Unwrap a versioned envelope. Any mismatch yields `None`.
pub fn decode<T: DeserializeOwned>(blob: &str) -> Option<T> {
    let envelope: Envelope<T> = match serde_json::from_str(blob) {
        Ok(envelope) => envelope,
        Err(e) => {
            log::warn!("Discarding malformed snapshot: {}", e);
            return None;
        }
    };
    if envelope.version != SNAPSHOT_VERSION {
        log::warn!(
            "Discarding snapshot version {} (expected {})",
            envelope.version,
            SNAPSHOT_VERSION
        );
        return None;
    }
    Some(envelope.data)
}

/// Load and decode `key`, or `None` if missing or unusable.
pub fn load_snapshot<T: DeserializeOwned>(store: &dyn Persistence, key: &str) -> Option<T> {
    let blob = store.load(key)?;
    let data = decode(&blob);
    if data.is_none() {
        log::info!("Persisted '{}' ignored, using defaults", key);
    }
    data
}

pub fn save_snapshot<T: Serialize>(store: &mut dyn Persistence, key: &str, data: &T) {
    if let Some(blob) = encode(data) {
        store.save(key, &blob);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPersistence;

impl Persistence for NullPersistence {
    fn load(&self, _key: &str) -> Option<String> {
        None
    }

    fn save(&mut self, _key: &str, _blob: &str) {}
}

/// In-memory store. Clones share the same map, so a test can keep a handle
/// while the sandbox owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: &str, blob: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), blob.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self, key: &str) -> Option<String> {
        self.get(key)
    }

    fn save(&mut self, key: &str, blob: &str) {
        self.insert(key, blob);
    }
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    dir: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFilePersistence { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Persistence for JsonFilePersistence {
    fn load(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                log::warn!("Failed to read '{}': {}", path.display(), e);
                None
            }
        }
    }

    fn save(&mut self, key: &str, blob: &str) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            log::warn!("Failed to create '{}': {}", self.dir.display(), e);
            return;
        }
        let path = self.path_for(key);
        if let Err(e) = std::fs::write(&path, blob) {
            log::warn!("Failed to write '{}': {}", path.display(), e);
        }
    }
}
