//! Saving and restoring trained models
//!
//! A trained model becomes an opaque blob (a JSON envelope around the
//! model's snapshot) stored under a caller-chosen key. Stores treat the key
//! as an opaque identifier.

use crate::error::{ModelError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// Version of the envelope layout written by [`PersistentModel::to_blob`]
pub const FORMAT_VERSION: u32 = 1;

/// Keyed storage for model blobs
pub trait ModelStore: Send + Sync {
    /// Store `blob` under `key`, replacing any previous blob
    fn put(&self, key: &str, blob: Vec<u8>) -> Result<()>;

    /// Fetch the blob stored under `key`
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Whether a blob is stored under `key`
    fn contains(&self, key: &str) -> Result<bool>;
}

/// In-process store backed by a map
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.blobs
            .lock()
            .map_err(|_| ModelError::Persistence("Memory store lock poisoned".to_string()))
    }
}

impl ModelStore for MemoryStore {
    fn put(&self, key: &str, blob: Vec<u8>) -> Result<()> {
        self.lock()?.insert(key.to_string(), blob);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| missing_key(key))
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.contains_key(key))
    }
}

/// Store keeping one file per key inside a directory.
///
/// Keys are hex-encoded into file names, so they are never interpreted as paths.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Use `root` as the store directory, creating it if needed
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let encoded: String = key.bytes().map(|b| format!("{:02x}", b)).collect();
        self.root.join(format!("{}.json", encoded))
    }
}

impl ModelStore for DirectoryStore {
    fn put(&self, key: &str, blob: Vec<u8>) -> Result<()> {
        fs::write(self.path_for(key), blob)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Err(missing_key(key));
        }
        Ok(fs::read(path)?)
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key).exists())
    }
}

fn missing_key(key: &str) -> ModelError {
    ModelError::Persistence(format!("No model stored under key '{}'", key))
}

/// Wrapper written around every snapshot
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    kind: String,
    format_version: u32,
    saved_at: DateTime<Utc>,
    model: T,
}

/// A model that can be turned into a blob and restored from one.
///
/// Only trained models can be saved; restored models are trained.
pub trait PersistentModel: Sized {
    /// Tag identifying the model type inside the envelope
    const KIND: &'static str;

    /// Serializable learned state
    type Snapshot: Serialize + DeserializeOwned;

    fn snapshot(&self) -> Result<Self::Snapshot>;

    fn restore(snapshot: Self::Snapshot) -> Result<Self>;

    fn to_blob(&self) -> Result<Vec<u8>> {
        let envelope = Envelope {
            kind: Self::KIND.to_string(),
            format_version: FORMAT_VERSION,
            saved_at: Utc::now(),
            model: self.snapshot()?,
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    fn from_blob(blob: &[u8]) -> Result<Self> {
        let envelope: Envelope<serde_json::Value> = serde_json::from_slice(blob)?;

        if envelope.kind != Self::KIND {
            return Err(ModelError::Persistence(format!(
                "Blob holds a '{}' model, expected '{}'",
                envelope.kind,
                Self::KIND
            )));
        }
        if envelope.format_version != FORMAT_VERSION {
            return Err(ModelError::Persistence(format!(
                "Unsupported blob format version {}",
                envelope.format_version
            )));
        }

        Self::restore(serde_json::from_value(envelope.model)?)
    }

    fn save(&self, store: &dyn ModelStore, key: &str) -> Result<()> {
        store.put(key, self.to_blob()?)?;
        info!(kind = Self::KIND, key, "model saved");
        Ok(())
    }

    fn load(store: &dyn ModelStore, key: &str) -> Result<Self> {
        let model = Self::from_blob(&store.get(key)?)?;
        info!(kind = Self::KIND, key, "model loaded");
        Ok(model)
    }
}
