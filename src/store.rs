use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use tempfile::Builder;

use crate::domain::{Dataset, DatasetName, SheetValues};
use crate::error::DashError;

/// Durable name-keyed storage for the last good copy of every dataset.
///
/// `get` on a name that was never stored is `Ok(None)`, not an error.
pub trait DatasetCache: Send + Sync + 'static {
    fn get(&self, name: &DatasetName) -> Result<Option<Dataset>, DashError>;
    fn put(&self, name: &DatasetName, dataset: &Dataset) -> Result<(), DashError>;
}

/// One JSON file per dataset under `<root>/datasets/`.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: Utf8PathBuf,
}

impl FileCache {
    pub fn new() -> Result<Self, DashError> {
        let root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("bizdash")).ok()
            })
            .ok_or_else(|| DashError::Storage("unable to resolve cache directory".to_string()))?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn entry_path(&self, name: &DatasetName) -> Utf8PathBuf {
        self.root.join("datasets").join(format!("{name}.json"))
    }

    pub fn ensure_root(&self) -> Result<(), DashError> {
        fs::create_dir_all(self.root.join("datasets").as_std_path())
            .map_err(|err| DashError::Storage(err.to_string()))
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), DashError> {
        let parent = path
            .parent()
            .ok_or_else(|| DashError::Storage("invalid cache entry path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| DashError::Storage(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix("bizdash-entry")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| DashError::Storage(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| DashError::Storage(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| DashError::Storage(err.to_string()))?;
        Ok(())
    }
}

impl DatasetCache for FileCache {
    fn get(&self, name: &DatasetName) -> Result<Option<Dataset>, DashError> {
        let path = self.entry_path(name);
        let content = match fs::read(path.as_std_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(DashError::Storage(format!("read {path}: {err}"))),
        };
        let stored: SheetValues = serde_json::from_slice(&content)
            .map_err(|err| DashError::Storage(format!("corrupt entry {path}: {err}")))?;
        Ok(Some(Dataset::from_stored(name.clone(), stored)))
    }

    fn put(&self, name: &DatasetName, dataset: &Dataset) -> Result<(), DashError> {
        let content = serde_json::to_vec(&dataset.to_stored())
            .map_err(|err| DashError::Storage(err.to_string()))?;
        Self::write_bytes_atomic(&self.entry_path(name), &content)
    }
}

/// Process-local cache holding serialized entries, for hosts without a disk
/// and for tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<DatasetName, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores raw text under a name, bypassing serialization.
    pub fn insert_raw(&self, name: &DatasetName, raw: impl Into<String>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(name.clone(), raw.into());
        }
    }

    pub fn raw(&self, name: &DatasetName) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(name).cloned())
    }
}

impl DatasetCache for MemoryCache {
    fn get(&self, name: &DatasetName) -> Result<Option<Dataset>, DashError> {
        let Some(raw) = self.raw(name) else {
            return Ok(None);
        };
        let stored: SheetValues = serde_json::from_str(&raw)
            .map_err(|err| DashError::Storage(format!("corrupt entry {name}: {err}")))?;
        Ok(Some(Dataset::from_stored(name.clone(), stored)))
    }

    fn put(&self, name: &DatasetName, dataset: &Dataset) -> Result<(), DashError> {
        let raw = serde_json::to_string(&dataset.to_stored())
            .map_err(|err| DashError::Storage(err.to_string()))?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| DashError::Storage("memory cache lock poisoned".to_string()))?;
        entries.insert(name.clone(), raw);
        Ok(())
    }
}

impl<T: DatasetCache> DatasetCache for std::sync::Arc<T> {
    fn get(&self, name: &DatasetName) -> Result<Option<Dataset>, DashError> {
        (**self).get(name)
    }

    fn put(&self, name: &DatasetName, dataset: &Dataset) -> Result<(), DashError> {
        (**self).put(name, dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let cache = FileCache::new_with_root(Utf8PathBuf::from("/tmp/bizdash-test"));
        let name: DatasetName = "staffDistribution".parse().unwrap();
        assert!(
            cache
                .entry_path(&name)
                .ends_with("datasets/staffDistribution.json")
        );
    }

    #[test]
    fn memory_cache_miss_is_none() {
        let cache = MemoryCache::new();
        let name: DatasetName = "income".parse().unwrap();
        assert!(cache.get(&name).unwrap().is_none());
    }
}
