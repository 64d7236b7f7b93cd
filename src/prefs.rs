//! Process-wide key-value preferences.
//!
//! Values are JSON so callers can store strings, flags, lists and encoded
//! records under one key space, the way a platform defaults database does.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::error::StoreError;

/// Durable key-value record shared by the gate and the prompt library.
pub trait Preferences: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Apply several writes as one durable update.
    fn apply(&self, writes: Vec<(String, Option<Value>)>) -> Result<(), StoreError> {
        for (key, value) in writes {
            match value {
                Some(value) => self.set(&key, value)?,
                None => self.remove(&key)?,
            }
        }
        Ok(())
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key), Some(Value::Bool(true)))
    }
}

/// Volatile preferences, for tests and previews.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Value>>, StoreError> {
        self.values.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl Preferences for MemoryPreferences {
    fn get(&self, key: &str) -> Option<Value> {
        self.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn apply(&self, writes: Vec<(String, Option<Value>)>) -> Result<(), StoreError> {
        let mut values = self.lock()?;
        for (key, value) in writes {
            match value {
                Some(value) => values.insert(key, value),
                None => values.remove(&key),
            };
        }
        Ok(())
    }
}

/// Preferences persisted as one JSON object on disk.
///
/// Every write rewrites the file through a temporary sibling and a rename, so
/// a crash leaves either the old or the new contents.
///
/// A file that exists but cannot be read opens empty and read-only: every
/// write fails with [`StoreError::WriteFailed`] so the unread contents are
/// never replaced.
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
    unreadable: Option<String>,
}

impl JsonFilePreferences {
    /// Open the file at `path`. A missing file starts empty. A corrupt file
    /// starts empty and is replaced by the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut unreadable = None;
        let values = match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                tracing::warn!(
                    "Preferences {} are corrupt and will be replaced on the next write: {}",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(
                    "Cannot read preferences {}, refusing writes: {}",
                    path.display(),
                    e
                );
                unreadable = Some(e.to_string());
                BTreeMap::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
            unreadable,
        }
    }

    /// Whether writes are refused because the file could not be read.
    pub fn is_read_only(&self) -> bool {
        self.unreadable.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Value>>, StoreError> {
        self.values.lock().map_err(|_| StoreError::Poisoned)
    }

    fn write_err(&self, e: impl std::fmt::Display) -> StoreError {
        StoreError::WriteFailed {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }

    fn flush(&self, values: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        if let Some(cause) = &self.unreadable {
            return Err(self.write_err(format!("existing file could not be read ({cause})")));
        }

        let json = serde_json::to_string_pretty(values)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.write_err(e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| self.write_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.write_err(e))
    }

    /// Mutate a copy and only publish it in memory once it is on disk.
    fn update(
        &self,
        mutate: impl FnOnce(&mut BTreeMap<String, Value>),
    ) -> Result<(), StoreError> {
        let mut values = self.lock()?;
        let mut next = values.clone();
        mutate(&mut next);
        self.flush(&next)?;
        *values = next;
        Ok(())
    }
}

impl Preferences for JsonFilePreferences {
    fn get(&self, key: &str) -> Option<Value> {
        self.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.update(|values| {
            values.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|values| {
            values.remove(key);
        })
    }

    fn apply(&self, writes: Vec<(String, Option<Value>)>) -> Result<(), StoreError> {
        self.update(|values| {
            for (key, value) in writes {
                match value {
                    Some(value) => values.insert(key, value),
                    None => values.remove(&key),
                };
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn memory_get_set_remove() {
        let prefs = MemoryPreferences::new();
        assert!(prefs.get("k").is_none());

        prefs.set("k", json!("v")).unwrap();
        assert_eq!(prefs.get_string("k").as_deref(), Some("v"));

        prefs.remove("k").unwrap();
        assert!(prefs.get_string("k").is_none());
    }

    #[test]
    fn typed_getters_ignore_other_shapes() {
        let prefs = MemoryPreferences::new();
        prefs.set("flag", json!("true")).unwrap();
        prefs.set("name", json!(42)).unwrap();
        assert!(!prefs.get_bool("flag"));
        assert!(prefs.get_string("name").is_none());
    }

    #[test]
    fn file_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let prefs = JsonFilePreferences::open(&path);
        prefs
            .apply(vec![
                ("launch_mode".to_string(), Some(json!("web"))),
                ("launch_web_url".to_string(), Some(json!("https://example.com/p"))),
            ])
            .unwrap();
        drop(prefs);

        let reopened = JsonFilePreferences::open(&path);
        assert_eq!(reopened.get_string("launch_mode").as_deref(), Some("web"));
        assert_eq!(
            reopened.get_string("launch_web_url").as_deref(),
            Some("https://example.com/p")
        );
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").unwrap();

        let prefs = JsonFilePreferences::open(&path);
        assert!(prefs.get("launch_mode").is_none());

        prefs.set("launch_mode", json!("main")).unwrap();
        let reopened = JsonFilePreferences::open(&path);
        assert_eq!(reopened.get_string("launch_mode").as_deref(), Some("main"));
    }

    #[test]
    fn failed_write_leaves_memory_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let prefs = JsonFilePreferences::open(&path);

        // A directory where the file should be makes the rename fail.
        std::fs::create_dir_all(path.join("blocker")).unwrap();

        assert!(!prefs.is_read_only());
        assert!(prefs.set("launch_mode", json!("main")).is_err());
        assert!(prefs.get("launch_mode").is_none());
    }

    #[test]
    fn unreadable_path_refuses_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::create_dir_all(path.join("blocker")).unwrap();

        let prefs = JsonFilePreferences::open(&path);
        assert!(prefs.is_read_only());
        assert!(matches!(
            prefs.set("launch_mode", json!("main")),
            Err(StoreError::WriteFailed { .. })
        ));
        assert!(!path.with_extension("json.tmp").exists());
        assert!(path.join("blocker").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loop_is_never_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::os::unix::fs::symlink(&path, &path).unwrap();

        let prefs = JsonFilePreferences::open(&path);
        assert!(prefs.is_read_only());
        assert!(prefs.get("launch_mode").is_none());

        let err = prefs
            .apply(vec![("launch_mode".to_string(), Some(json!("main")))])
            .unwrap_err();
        assert!(matches!(err, StoreError::WriteFailed { .. }));

        let meta = std::fs::symlink_metadata(&path).unwrap();
        assert!(meta.file_type().is_symlink());
        assert!(prefs.get("launch_mode").is_none());
    }
}
