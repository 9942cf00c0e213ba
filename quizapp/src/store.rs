//! Persistent key-value storage.
//!
//! A flat map of string keys to serialized string values, in the spirit of a
//! browser's local storage. [`Storage`] adds JSON (de)serialization on top of
//! any [`KeyValueStore`] backend.
//!
//! An absent key and a stored empty string both load as "no value"; saving a
//! value that serializes to `null` stores the empty string.

use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors raised by stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("failed to access store file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The backing file is not a JSON object of strings.
    #[error("corrupt store file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A stored value is not valid JSON for the requested type.
    #[error("malformed value under `{key}`: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// A value could not be serialized.
    #[error("failed to serialize `{key}`: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String-keyed map of string values.
pub trait KeyValueStore {
    /// Raw value under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Store a raw value.
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Forget `key`.
    fn remove_item(&mut self, key: &str) -> Result<(), StoreError>;
    /// All keys, sorted.
    fn keys(&self) -> Vec<String>;
}

/// In-memory store, mostly for tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    items: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StoreError> {
        self.items.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }
}

/// Store kept in a JSON file, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`. A missing or empty file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let items = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            BTreeMap::new()
        };
        debug!("opened store {} with {} key(s)", path.display(), items.len());
        Ok(Self { path, items })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `items` to a temporary file next to the store and rename it
    /// over the store.
    fn persist(&self, items: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_err)?;
        let content = serde_json::to_string_pretty(items).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
        file.write_all(content.as_bytes()).map_err(io_err)?;
        file.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    /// Persist a changed copy of the items, keeping them only once written.
    fn update(&mut self, change: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), StoreError> {
        let mut items = self.items.clone();
        change(&mut items);
        self.persist(&items)?;
        self.items = items;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StoreError> {
        if !self.items.contains_key(key) {
            return Ok(());
        }
        self.update(|items| {
            items.remove(key);
        })
    }

    fn keys(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }
}

/// Typed access to a key-value store.
pub struct Storage {
    backend: Box<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Load the value under `key`. Absent and empty entries give `None`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.backend.get_item(key)? {
            None => Ok(None),
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StoreError::Malformed {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    /// Save `value` under `key`. A `null` value is stored as the empty string.
    pub fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        let raw = if value.is_null() {
            String::new()
        } else {
            value.to_string()
        };
        self.backend.set_item(key, &raw)
    }

    /// Forget `key`.
    pub fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.backend.remove_item(key)
    }

    /// Raw entries, for display.
    pub fn entries(&self) -> Result<Vec<(String, String)>, StoreError> {
        self.backend
            .keys()
            .into_iter()
            .map(|key| {
                let value = self.backend.get_item(&key)?.unwrap_or_default();
                Ok((key, value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_absent_and_empty_load_as_none() {
        let mut storage = Storage::new(MemoryStore::new());
        assert_eq!(storage.load::<Value>("user").unwrap(), None);

        storage.save("user", &Option::<String>::None).unwrap();
        assert_eq!(storage.load::<Value>("user").unwrap(), None);
        assert_eq!(
            storage.entries().unwrap(),
            vec![("user".to_string(), String::new())]
        );
    }

    #[test]
    fn test_save_then_load() {
        let mut storage = Storage::new(MemoryStore::new());
        storage
            .save("user", &json!({"id": "12345", "prefs": {"grade": 4}}))
            .unwrap();
        storage.save("page", "question").unwrap();

        assert_eq!(
            storage.load::<Value>("user").unwrap(),
            Some(json!({"id": "12345", "prefs": {"grade": 4}}))
        );
        assert_eq!(
            storage.load::<String>("page").unwrap().as_deref(),
            Some("question")
        );

        storage.remove("page").unwrap();
        assert_eq!(storage.load::<String>("page").unwrap(), None);
    }

    #[test]
    fn test_malformed_value() {
        let mut backend = MemoryStore::new();
        backend.set_item("user", "{not json").unwrap();
        let storage = Storage::new(backend);
        assert!(matches!(
            storage.load::<Value>("user"),
            Err(StoreError::Malformed { ref key, .. }) if key == "user"
        ));
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let mut store = FileStore::open(&path).unwrap();
        assert!(store.keys().is_empty());
        store.set_item("page", "\"question\"").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get_item("page").unwrap().as_deref(),
            Some("\"question\"")
        );
        assert_eq!(reopened.path(), path.as_path());
    }

    #[test]
    fn test_failed_write_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let mut store = FileStore::open(&path).unwrap();
        store.set_item("page", "\"user\"").unwrap();

        // a directory in place of the store file makes the rename fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(matches!(
            store.set_item("page", "\"question\""),
            Err(StoreError::Io { .. })
        ));
        assert_eq!(store.get_item("page").unwrap().as_deref(), Some("\"user\""));
        assert!(matches!(
            store.remove_item("page"),
            Err(StoreError::Io { .. })
        ));
        assert_eq!(store.keys(), vec!["page".to_string()]);

        // no temporary files are left behind
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_file_store_corrupt_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        fs::write(&path, "").unwrap();
        assert!(FileStore::open(&path).unwrap().keys().is_empty());

        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
