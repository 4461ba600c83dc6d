//! String key/value stores backing the session holder.
//!
//! `FileStore` keeps a flat JSON object in one file with restricted
//! permissions (0600). Token values are never logged.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// A string key/value store.
pub trait KeyValueStore {
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`, returning whether it was present.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn remove(&mut self, key: &str) -> Result<bool>;

    /// Drops every entry.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn clear(&mut self) -> Result<()>;
}

/// In-memory store; lives as long as the value.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

/// JSON-file store. Every operation re-reads the file so concurrent
/// processes see each other's writes.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credentials from {}", self.path.display()))?;
        Ok(Some(contents).filter(|c| !c.trim().is_empty()))
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        let Some(contents) = self.read()? else {
            return Ok(HashMap::new());
        };
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials from {}", self.path.display()))
    }

    /// Like `load`, but an unparseable file is treated as stale: it is
    /// deleted and the store starts over empty.
    fn load_for_update(&self) -> Result<HashMap<String, String>> {
        let Some(contents) = self.read()? else {
            return Ok(HashMap::new());
        };
        match serde_json::from_str(&contents) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "discarding unparseable credentials file"
                );
                fs::remove_file(&self.path)
                    .with_context(|| format!("Failed to remove {}", self.path.display()))?;
                Ok(HashMap::new())
            }
        }
    }

    /// Writes to a sibling tmp file (0600) and renames it over the target,
    /// so readers never see a partial file.
    fn save(&self, entries: &HashMap<String, String>) -> Result<()> {
        if entries.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).with_context(|| {
                    format!("Failed to remove {}", self.path.display())
                })?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(entries).context("Failed to serialize credentials")?;
        let tmp_path = self.path.with_extension("json.tmp");
        // mode only applies on create
        if tmp_path.exists() {
            fs::remove_file(&tmp_path)
                .with_context(|| format!("Failed to remove {}", tmp_path.display()))?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&tmp_path)
            .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
        file.write_all(contents.as_bytes())
            .and_then(|()| file.sync_all())
            .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                self.path.display()
            )
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let mut entries = self.load_for_update()?;
        let had = entries.remove(key).is_some();
        if had {
            self.save(&entries)?;
        }
        Ok(had)
    }

    fn clear(&mut self) -> Result<()> {
        self.save(&HashMap::new())
    }
}
