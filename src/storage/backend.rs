//! Key-value backends for profile data.
//!
//! This module provides the backends a [`super::ProfileStore`] can sit on:
//! - `FileBackend` - One `<key>.json` file per key in the profile directory (default)
//! - `MemoryBackend` - In-process map, for tests and embedding

use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Trait for backends that persist whole JSON values by logical key.
///
/// Values travel as raw JSON text so callers can detect malformed data
/// themselves instead of failing inside the backend.
pub trait KeyValueBackend: Send + Sync {
    /// Read the raw JSON stored under a key.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under a key.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Returns true if it existed.
    fn remove(&mut self, key: &str) -> Result<bool>;

    /// List stored keys.
    fn keys(&self) -> Result<Vec<String>>;

    /// Get the storage location description (for display purposes).
    fn location(&self) -> String;

    /// Get the backend type name.
    fn backend_type(&self) -> &'static str;
}

/// Available backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// JSON files under the profile directory
    File,
    /// In-process map
    Memory,
}

impl BackendType {
    /// Parse a backend type from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "file" | "default" => Some(Self::File),
            "memory" | "mem" => Some(Self::Memory),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keys become file names, so only a safe alphabet is accepted.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::InvalidInput(format!("Invalid storage key: {:?}", key)));
    }
    Ok(())
}

/// File backend storing `<root>/<key>.json`.
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Open a file backend, creating the directory if needed.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Directory holding the JSON files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{}.json", key)))
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        // Write to a sibling temp file and rename over the target so readers
        // never see a half-written value.
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn backend_type(&self) -> &'static str {
        BackendType::File.as_str()
    }
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.entries.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }

    fn backend_type(&self) -> &'static str {
        BackendType::Memory.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backend_type_parse() {
        assert_eq!(BackendType::from_str("FILE"), Some(BackendType::File));
        assert_eq!(BackendType::from_str("mem"), Some(BackendType::Memory));
        assert_eq!(BackendType::from_str("sqlite"), None);
        assert_eq!(BackendType::Memory.to_string(), "memory");
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("fighterXp").is_ok());
        assert!(validate_key("tasks_v2-old").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("a/b").is_err());
    }

    #[test]
    fn test_file_backend_roundtrip() {
        let temp = TempDir::new().unwrap();
        let mut backend = FileBackend::open(&temp.path().join("p")).unwrap();

        assert_eq!(backend.get("fighters").unwrap(), None);
        backend.set("fighters", "[]").unwrap();
        backend.set("fighters", r#"[{"id":"ftr-1","name":"Ash"}]"#).unwrap();
        assert_eq!(
            backend.get("fighters").unwrap().as_deref(),
            Some(r#"[{"id":"ftr-1","name":"Ash"}]"#)
        );
        assert!(backend.root().join("fighters.json").exists());

        backend.set("skillTree", "[]").unwrap();
        assert_eq!(backend.keys().unwrap(), vec!["fighters", "skillTree"]);

        assert!(backend.remove("fighters").unwrap());
        assert!(!backend.remove("fighters").unwrap());
    }

    #[test]
    fn test_file_backend_rejects_bad_key() {
        let temp = TempDir::new().unwrap();
        let mut backend = FileBackend::open(temp.path()).unwrap();
        assert!(matches!(
            backend.set("../x", "1"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_memory_backend() {
        let mut backend = MemoryBackend::new();
        backend.set("a", "1").unwrap();
        assert_eq!(backend.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(backend.keys().unwrap(), vec!["a"]);
        assert!(backend.remove("a").unwrap());
        assert_eq!(backend.location(), "memory");
    }
}
