//! File-backed store.
//!
//! Each key is stored as `<root>/<key>.json`. Writes land in `<key>.json.tmp` first and are
//! then renamed over the target, so a reader only ever sees the previous document or the new
//! one, never a truncated file.

use crate::{validate_key, KeyValueStore, StoreError, StoreResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

const DOCUMENT_EXTENSION: &str = "json";
const TEMP_SUFFIX: &str = "json.tmp";

/// A [`KeyValueStore`] persisting one JSON document per key in a directory.
///
/// The root directory is validated and canonicalised at construction time; keys are validated
/// on every call so no operation can reach outside the root.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens an existing store directory.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidRootDirectory` if:
    /// - the directory does not exist or is not a directory
    /// - path canonicalisation fails
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(StoreError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                root.display()
            )));
        }

        if !root.is_dir() {
            return Err(StoreError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root.display()
            )));
        }

        let root = root.canonicalize().map_err(|e| {
            StoreError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self { root })
    }

    /// Creates the store directory (and parents) if needed, then opens it.
    pub fn create(root: impl AsRef<Path>) -> StoreResult<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        Self::open(root)
    }

    /// The canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, DOCUMENT_EXTENSION))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, TEMP_SUFFIX))
    }
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        match fs::read_to_string(self.document_path(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        validate_key(key)?;
        let temp = self.temp_path(key);
        fs::write(&temp, value.as_bytes()).await?;
        if let Err(e) = fs::rename(&temp, self.document_path(key)).await {
            if let Err(cleanup) = fs::remove_file(&temp).await {
                tracing::warn!(
                    "failed to remove temporary file {}: {}",
                    temp.display(),
                    cleanup
                );
            }
            return Err(StoreError::Io(e));
        }
        tracing::debug!(key, bytes = value.len(), "stored document");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        validate_key(key)?;
        match fs::remove_file(self.document_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn clear(&self) -> StoreResult<()> {
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_document = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".json") || n.ends_with(".json.tmp"));
            if is_document && entry.file_type().await?.is_file() {
                fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_missing_root_fails() {
        let temp = TempDir::new().unwrap();
        let result = FileStore::open(temp.path().join("missing"));
        assert!(matches!(result, Err(StoreError::InvalidRootDirectory(_))));
    }

    #[test]
    fn open_file_as_root_fails() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        std::fs::write(&file, "not a directory").unwrap();
        assert!(matches!(
            FileStore::open(&file),
            Err(StoreError::InvalidRootDirectory(_))
        ));
    }

    #[test]
    fn create_makes_nested_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("a").join("b");
        let store = FileStore::create(&root).unwrap();
        assert!(store.root().is_dir());
    }

    #[tokio::test]
    async fn set_writes_json_file_and_leaves_no_temp() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();

        store.set("medicaments", "[]".into()).await.unwrap();

        let on_disk = std::fs::read_to_string(temp.path().join("medicaments.json")).unwrap();
        assert_eq!(on_disk, "[]");
        assert!(!temp.path().join("medicaments.json.tmp").exists());
        assert_eq!(
            store.get("medicaments").await.unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test]
    async fn get_missing_key_is_none() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        assert_eq!(store.get("commandes").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_overwrites_previous_value() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        store.set("session", "null".into()).await.unwrap();
        store.set("session", "{\"id\":\"u1\"}".into()).await.unwrap();
        assert_eq!(
            store.get("session").await.unwrap().as_deref(),
            Some("{\"id\":\"u1\"}")
        );
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        store.set("session", "null".into()).await.unwrap();
        store.remove("session").await.unwrap();
        store.remove("session").await.unwrap();
        assert_eq!(store.get("session").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_only_removes_documents() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        store.set("a", "1".into()).await.unwrap();
        store.set("b", "2".into()).await.unwrap();
        std::fs::write(temp.path().join("notes.txt"), "keep me").unwrap();

        store.clear().await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap(), None);
        assert!(temp.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn keys_cannot_escape_root() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path()).unwrap();
        let err = store.set("../outside", "1".into()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }
}
