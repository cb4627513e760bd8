use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::{Map, Value};

pub const PREFERENCES_ENV: &str = "BANAO_PREFERENCES";

/// Durable client-local key/value preferences.
pub trait PreferenceStore: Send {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// JSON object on disk; unrelated keys written by other processes survive a save.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$BANAO_PREFERENCES`, else `<config dir>/banao/preferences.json`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(PREFERENCES_ENV).filter(|value| !value.is_empty()) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("banao").join("preferences.json"))
    }

    pub fn open_default() -> anyhow::Result<Self> {
        let path = Self::default_path().context("no configuration directory for preferences")?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self, key: &str) -> Option<String> {
        read_json_object(&self.path)?
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn save(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut on_disk = read_json_object(&self.path).unwrap_or_default();
        on_disk.insert(key.to_string(), Value::String(value.to_string()));
        write_json_object(&self.path, &on_disk)
            .with_context(|| format!("failed to persist preferences to {}", self.path.display()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    values: BTreeMap<String, String>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.values.insert(key.to_string(), value.to_string());
        store
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn read_json_object(path: &Path) -> Option<Map<String, Value>> {
    let raw = std::fs::read_to_string(path).ok()?;
    let parsed: Value = serde_json::from_str(&raw).ok()?;
    parsed.as_object().cloned()
}

fn write_json_object(path: &Path, payload: &Map<String, Value>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(
        path,
        serde_json::to_string_pretty(&Value::Object(payload.clone()))?,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};

    #[test]
    fn file_store_round_trips_and_keeps_other_keys() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("cfg").join("preferences.json");
        std::fs::create_dir_all(temp.path().join("cfg"))?;
        std::fs::write(&path, r#"{"other": "kept"}"#)?;

        let mut store = FilePreferenceStore::new(&path);
        assert_eq!(store.load("theme"), None);
        store.save("theme", "dark")?;

        let reopened = FilePreferenceStore::new(&path);
        assert_eq!(reopened.load("theme").as_deref(), Some("dark"));
        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(parsed["other"], json!("kept"));
        Ok(())
    }

    #[test]
    fn file_store_treats_corrupt_file_as_empty() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("preferences.json");
        std::fs::write(&path, "not json")?;

        let mut store = FilePreferenceStore::new(&path);
        assert_eq!(store.load("theme"), None);
        store.save("theme", "light")?;
        assert_eq!(store.load("theme").as_deref(), Some("light"));
        Ok(())
    }

    #[test]
    fn memory_store_saves() -> anyhow::Result<()> {
        let mut store = MemoryPreferenceStore::with("theme", "dark");
        assert_eq!(store.load("theme").as_deref(), Some("dark"));
        store.save("theme", "light")?;
        assert_eq!(store.load("theme").as_deref(), Some("light"));
        Ok(())
    }
}
