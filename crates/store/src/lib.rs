//! Dispensary Record Store
//!
//! This crate is the only code that talks to the persistent key-value store. Everything above
//! it (repositories, the order engine) works with typed collections.
//!
//! ## Storage Model
//!
//! - The store is a flat namespace of string keys mapping to JSON documents
//! - Each named collection (`medicaments`, `ordonnances`, `commandes`, ...) is one JSON array
//! - Reads load the whole collection; writes replace the whole collection
//! - Singletons (`session`, `initialized`) are single JSON values under their own key
//!
//! ## Backends
//!
//! - [`MemoryStore`]: in-process map, for tests and throwaway sessions
//! - [`FileStore`]: one `<key>.json` file per key under a root directory
//!
//! ```text
//! dispensary_data/
//! ├── medicaments.json
//! ├── ordonnances.json
//! ├── commandes.json
//! ├── pharmacies.json
//! ├── session.json
//! └── initialized.json
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use dispensary_store::{Collection, CollectionKey, FileStore};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), dispensary_store::StoreError> {
//! let store = Arc::new(FileStore::create("dispensary_data")?);
//! let pharmacies: Collection<FileStore, serde_json::Value> =
//!     Collection::new(store, CollectionKey::Pharmacies);
//! let all = pharmacies.load().await?;
//! # let _ = all;
//! # Ok(())
//! # }
//! ```

mod collection;
mod constants;
mod file;
mod kv;
mod layout;
mod memory;

pub use collection::{Collection, Singleton};
pub use constants::{CollectionKey, SingletonKey, MAX_KEY_LEN};
pub use file::FileStore;
pub use kv::{validate_key, KeyValueStore};
pub use layout::{initialise_layout, reset_layout};
pub use memory::MemoryStore;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Key is empty, too long, or contains characters outside the allowed set
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// A value could not be encoded for storage
    #[error("failed to serialize value for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stored document could not be decoded
    #[error("failed to deserialize value stored under key '{key}': {source}")]
    Deserialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
