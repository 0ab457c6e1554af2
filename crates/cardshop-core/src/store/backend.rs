use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};

/// Session file name in cache directory
pub const SESSION_FILE: &str = "session.json";

/// String key/value storage that outlives the process.
pub trait CredentialBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Keeps every slot in one JSON object on disk.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            path: cache_dir.as_ref().join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read session file")?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).context("Failed to parse session file")
    }

    fn save(&self, slots: &BTreeMap<String, String>) -> Result<()> {
        if slots.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).context("Failed to remove session file")?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(slots)?;
        // Write to a sibling and rename so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).context("Failed to write session file")?;
        std::fs::rename(&tmp, &self.path).context("Failed to replace session file")?;
        Ok(())
    }
}

impl CredentialBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        // An unreadable file is replaced rather than blocking new writes
        let mut slots = self.load().unwrap_or_default();
        slots.insert(key.to_string(), value.to_string());
        self.save(&slots)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut slots = match self.load() {
            Ok(slots) => slots,
            Err(_) => {
                // Corrupt file: dropping it is the only way to remove the key
                if self.path.exists() {
                    std::fs::remove_file(&self.path)
                        .context("Failed to remove session file")?;
                }
                return Ok(());
            }
        };
        if slots.remove(key).is_some() {
            self.save(&slots)?;
        }
        Ok(())
    }
}

/// Process-local backend. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryBackend {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate slots, e.g. to simulate a record left by an earlier run.
    pub fn with_slots<I, K, V>(slots: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            slots: Mutex::new(
                slots
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

impl CredentialBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_backend_set_get_remove() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());

        assert_eq!(backend.get("token").unwrap(), None);

        backend.set("token", "abc").unwrap();
        backend.set("user", "{}").unwrap();
        assert_eq!(backend.get("token").unwrap().as_deref(), Some("abc"));
        assert!(backend.path().exists());

        backend.remove("token").unwrap();
        assert_eq!(backend.get("token").unwrap(), None);
        assert_eq!(backend.get("user").unwrap().as_deref(), Some("{}"));

        backend.remove("user").unwrap();
        assert!(!backend.path().exists());
    }

    #[test]
    fn test_file_backend_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("nested").join("cardshop"));
        backend.set("token", "abc").unwrap();
        assert_eq!(backend.get("token").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_file_backend_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());
        std::fs::write(backend.path(), "not json").unwrap();

        assert!(backend.get("token").is_err());

        // Removing from a corrupt file drops the file
        backend.remove("token").unwrap();
        assert!(!backend.path().exists());

        std::fs::write(backend.path(), "not json").unwrap();
        backend.set("token", "fresh").unwrap();
        assert_eq!(backend.get("token").unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_memory_backend() {
        let backend = MemoryBackend::with_slots([("token", "t1")]);
        assert_eq!(backend.get("token").unwrap().as_deref(), Some("t1"));
        backend.remove("token").unwrap();
        assert!(backend.is_empty());
    }
}
