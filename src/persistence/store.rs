//! Snapshot store implementations.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for snapshot save/load.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Durable save/load gateway for the endpoint address list.
pub trait EndpointStore: Send + Sync {
    /// Load the persisted address list. A missing snapshot is an empty pool,
    /// not an error.
    fn load(&self) -> Result<Vec<String>, PersistenceError>;

    /// Persist the current address list.
    fn save(&self, addresses: &[String]) -> Result<(), PersistenceError>;
}

/// On-disk snapshot format.
#[derive(Debug, Serialize, Deserialize, Default)]
struct Snapshot {
    #[serde(default)]
    endpoints: Vec<String>,
}

/// JSON file-backed store.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EndpointStore for JsonFileStore {
    fn load(&self) -> Result<Vec<String>, PersistenceError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        Ok(snapshot.endpoints)
    }

    fn save(&self, addresses: &[String]) -> Result<(), PersistenceError> {
        let snapshot = Snapshot {
            endpoints: addresses.to_vec(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&snapshot)?)?;
        Ok(())
    }
}

/// No-op store for ephemeral pools and tests.
pub struct NullStore;

impl EndpointStore for NullStore {
    fn load(&self) -> Result<Vec<String>, PersistenceError> {
        Ok(Vec::new())
    }

    fn save(&self, _addresses: &[String]) -> Result<(), PersistenceError> {
        Ok(())
    }
}
