//! Persistent store for marketplace records
//!
//! Each entity lives in its own [`Collection`], a keyed map that is either
//! held in memory or mirrored to a JSON file under the store directory.

mod collection;

pub use collection::Collection;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

use souq_types::Result;

/// Storage backend handle. Cheap to clone; opens collections on demand.
#[derive(Debug, Clone)]
pub enum Store {
    /// Nothing touches disk
    Memory,
    /// One `<name>.json` file per collection under this directory
    Dir(PathBuf),
}

impl Store {
    pub fn in_memory() -> Self {
        Store::Memory
    }

    /// Create the directory if needed and return a file-backed store
    pub fn open(store_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&store_dir)?;
        Ok(Store::Dir(store_dir))
    }

    /// Open (or create) a named collection
    pub fn collection<T>(&self, name: &str) -> Result<Collection<T>>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        match self {
            Store::Memory => Ok(Collection::in_memory()),
            Store::Dir(dir) => Collection::open(dir.join(format!("{}.json", name))),
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, Store::Dir(_))
    }
}

/// Stable hex SHA-256 of a natural key. Parts are trimmed and lowercased
/// so cosmetic differences map to the same record.
pub fn natural_key_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0x1f]);
        }
        hasher.update(part.trim().to_lowercase().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
