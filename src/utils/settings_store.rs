//! Where persisted table layouts live
//!
//! A store maps a settings key (one per table) to an opaque state string.
//! The table only ever reads and writes whole documents.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, TableError};
use crate::utils::app_paths::AppPaths;

pub trait SettingsStore {
    /// The stored state for `key`, `None` when nothing was saved yet
    fn read_state(&self, key: &str) -> Result<Option<String>>;

    fn write_state(&mut self, key: &str, state: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    states: HashMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn read_state(&self, key: &str) -> Result<Option<String>> {
        Ok(self.states.get(key).cloned())
    }

    fn write_state(&mut self, key: &str, state: &str) -> Result<()> {
        self.states.insert(key.to_string(), state.to_string());
        Ok(())
    }
}

/// One JSON document per key inside a directory
#[derive(Debug, Clone)]
pub struct FileSettings {
    dir: PathBuf,
}

impl FileSettings {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the per-user layouts directory
    pub fn user_default() -> Result<Self> {
        let dir = AppPaths::layouts_dir().map_err(|e| TableError::Settings(e.to_string()))?;
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl SettingsStore for FileSettings {
    fn read_state(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let state = fs::read_to_string(&path)
            .map_err(|e| TableError::Settings(format!("{}: {}", path.display(), e)))?;
        debug!(target: "layout", "read {} bytes from {}", state.len(), path.display());
        Ok(Some(state))
    }

    fn write_state(&mut self, key: &str, state: &str) -> Result<()> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir)
            .and_then(|_| fs::write(&path, state))
            .map_err(|e| TableError::Settings(format!("{}: {}", path.display(), e)))?;
        debug!(target: "layout", "wrote layout to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_round_trip() {
        let mut store = MemorySettings::new();
        assert_eq!(store.read_state("t").unwrap(), None);
        store.write_state("t", "{}").unwrap();
        assert_eq!(store.read_state("t").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let temp = TempDir::new().unwrap();
        let mut store = FileSettings::new(temp.path().join("layouts"));

        assert_eq!(store.read_state("main/orders").unwrap(), None);
        store.write_state("main/orders", "{\"a\":1}").unwrap();

        assert!(temp.path().join("layouts").join("main_orders.json").exists());
        assert_eq!(
            store.read_state("main/orders").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
    }
}
