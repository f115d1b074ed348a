//! Key-value persistence backends for the entity store

use crate::core::error::{OdrnaError, Result};
use ahash::AHashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Durable string storage scoped to one client
pub trait StorageBackend: Send {
    /// Read the value stored under `key`, `None` when absent
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    fn write(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-process backend, lost when the process exits
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: AHashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON file per key inside a data directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(OdrnaError::Storage(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        // Write then rename so a crash never leaves a truncated collection
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| OdrnaError::Storage(format!("failed to write {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend() {
        let mut backend = MemoryBackend::new();
        assert!(backend.read("k").unwrap().is_none());
        backend.write("k", "v").unwrap();
        assert_eq!(backend.read("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_backend_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut backend = FileBackend::new(tmp.path().join("nested"));

        assert!(backend.read("odrna_tasks").unwrap().is_none());
        backend.write("odrna_tasks", "[]").unwrap();
        assert_eq!(backend.read("odrna_tasks").unwrap().as_deref(), Some("[]"));
        assert!(tmp.path().join("nested/odrna_tasks.json").exists());
    }
}
