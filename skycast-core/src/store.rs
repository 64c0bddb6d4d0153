//! String key-value persistence used for the "last searched city" preference.

use anyhow::{Context, Result, anyhow};
use std::{
    collections::BTreeMap,
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::config::Config;

/// Key under which the last successfully fetched city is stored.
pub const LAST_CITY_KEY: &str = "lastCity";

/// Synchronous string store.
///
/// The search controller calls `set` inline while applying a weather result, on
/// whatever tokio worker drives it. Implementations must stay quick: `FileStore`
/// does one small blocking read and write per call, which is acceptable for a
/// single-key file but not for anything slower.
pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| anyhow!("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// TOML file holding a flat string map.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `state.toml` in the platform data directory.
    pub fn open_default() -> Result<Self> {
        let dirs = Config::project_dirs()?;
        Ok(Self::at(dirs.data_dir().join("state.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file: {}", self.path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse state file: {}", self.path.display()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(|_| anyhow!("state file lock poisoned"))?;

        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string(&entries).context("Failed to serialize state to TOML")?;

        fs::write(&self.path, toml)
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_get_and_set() {
        let store = MemoryStore::new();
        assert_eq!(store.get(LAST_CITY_KEY).unwrap(), None);

        store.set(LAST_CITY_KEY, "London").unwrap();
        assert_eq!(store.get(LAST_CITY_KEY).unwrap().as_deref(), Some("London"));

        store.set(LAST_CITY_KEY, "Paris").unwrap();
        assert_eq!(store.get(LAST_CITY_KEY).unwrap().as_deref(), Some("Paris"));
    }

    #[test]
    fn file_store_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::at(dir.path().join("missing.toml"));

        assert_eq!(store.get(LAST_CITY_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.toml");

        let store = FileStore::at(&path);
        store.set(LAST_CITY_KEY, "Springfield, Illinois, US").unwrap();
        store.set("other", "value").unwrap();

        let reopened = FileStore::at(&path);
        assert_eq!(
            reopened.get(LAST_CITY_KEY).unwrap().as_deref(),
            Some("Springfield, Illinois, US")
        );
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("value"));
    }

    #[test]
    fn file_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.toml");
        fs::write(&path, "this is = = not toml").unwrap();

        let err = FileStore::at(&path).get(LAST_CITY_KEY).unwrap_err();
        assert!(err.to_string().contains("Failed to parse state file"));
    }
}
