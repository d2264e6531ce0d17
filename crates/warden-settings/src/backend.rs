//! ---
//! warden_section: "07-settings-governance"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Settings governance store, validation, and backends."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Storage for settings rows keyed by `(category, key)`.
//!
//! Every trait method is a single atomic operation on one row; concurrent
//! writers to the same row resolve last-writer-wins.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use warden_security::SettingCategory;

use crate::types::StoredSetting;

/// Current on-disk envelope version for [`FileBackend`].
pub const STORE_VERSION: u16 = 1;

/// Error type for settings storage.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported settings store version {0}")]
    UnsupportedVersion(u16),
}

type RowKey = (SettingCategory, String);

fn row_key(row: &StoredSetting) -> RowKey {
    (row.category, row.key.clone())
}

/// Keyed table of settings rows.
pub trait SettingsBackend: Send + Sync {
    /// Row stored under `(category, key)`, if any.
    fn fetch(&self, category: SettingCategory, key: &str)
        -> Result<Option<StoredSetting>, BackendError>;

    /// Rows in insertion order, optionally restricted to one category.
    fn list(&self, category: Option<SettingCategory>) -> Result<Vec<StoredSetting>, BackendError>;

    /// Insert or replace the row under its `(category, key)` in one step.
    fn upsert(&self, row: StoredSetting) -> Result<(), BackendError>;

    /// Store `row` only when its key is free. Returns whether it was stored.
    fn insert_if_absent(&self, row: StoredSetting) -> Result<bool, BackendError>;

    /// Returns whether a row was removed.
    fn remove(&self, category: SettingCategory, key: &str) -> Result<bool, BackendError>;
}

impl<T: SettingsBackend + ?Sized> SettingsBackend for Arc<T> {
    fn fetch(
        &self,
        category: SettingCategory,
        key: &str,
    ) -> Result<Option<StoredSetting>, BackendError> {
        (**self).fetch(category, key)
    }

    fn list(&self, category: Option<SettingCategory>) -> Result<Vec<StoredSetting>, BackendError> {
        (**self).list(category)
    }

    fn upsert(&self, row: StoredSetting) -> Result<(), BackendError> {
        (**self).upsert(row)
    }

    fn insert_if_absent(&self, row: StoredSetting) -> Result<bool, BackendError> {
        (**self).insert_if_absent(row)
    }

    fn remove(&self, category: SettingCategory, key: &str) -> Result<bool, BackendError> {
        (**self).remove(category, key)
    }
}

fn list_rows(
    rows: &IndexMap<RowKey, StoredSetting>,
    category: Option<SettingCategory>,
) -> Vec<StoredSetting> {
    rows.values()
        .filter(|row| category.map_or(true, |category| row.category == category))
        .cloned()
        .collect()
}

/// In-process backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: RwLock<IndexMap<RowKey, StoredSetting>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl SettingsBackend for MemoryBackend {
    fn fetch(
        &self,
        category: SettingCategory,
        key: &str,
    ) -> Result<Option<StoredSetting>, BackendError> {
        Ok(self.rows.read().get(&(category, key.to_owned())).cloned())
    }

    fn list(&self, category: Option<SettingCategory>) -> Result<Vec<StoredSetting>, BackendError> {
        Ok(list_rows(&self.rows.read(), category))
    }

    fn upsert(&self, row: StoredSetting) -> Result<(), BackendError> {
        self.rows.write().insert(row_key(&row), row);
        Ok(())
    }

    fn insert_if_absent(&self, row: StoredSetting) -> Result<bool, BackendError> {
        let mut rows = self.rows.write();
        let key = row_key(&row);
        if rows.contains_key(&key) {
            return Ok(false);
        }
        rows.insert(key, row);
        Ok(true)
    }

    fn remove(&self, category: SettingCategory, key: &str) -> Result<bool, BackendError> {
        Ok(self
            .rows
            .write()
            .shift_remove(&(category, key.to_owned()))
            .is_some())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreEnvelope {
    version: u16,
    #[serde(default)]
    settings: Vec<StoredSetting>,
}

/// JSON file backend. The file is rewritten through a temporary sibling and a
/// rename on every mutation, so readers never observe a partial document.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    rows: Mutex<IndexMap<RowKey, StoredSetting>>,
}

impl FileBackend {
    /// Open the store at `path`, starting empty when the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let path = path.as_ref().to_path_buf();
        let mut rows = IndexMap::new();
        if path.exists() {
            let bytes = fs::read(&path)?;
            let envelope: StoreEnvelope = serde_json::from_slice(&bytes)?;
            if envelope.version > STORE_VERSION {
                return Err(BackendError::UnsupportedVersion(envelope.version));
            }
            for row in envelope.settings {
                rows.insert(row_key(&row), row);
            }
        }
        debug!(store_path = %path.display(), rows = rows.len(), "settings store opened");
        Ok(Self {
            path,
            rows: Mutex::new(rows),
        })
    }

    /// Apply `change` to a copy of the rows, persist the copy, then commit it.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut IndexMap<RowKey, StoredSetting>) -> T,
    ) -> Result<T, BackendError> {
        let mut rows = self.rows.lock();
        let mut next = rows.clone();
        let outcome = change(&mut next);
        self.persist(&next)?;
        *rows = next;
        Ok(outcome)
    }

    fn persist(&self, rows: &IndexMap<RowKey, StoredSetting>) -> Result<(), BackendError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let envelope = StoreEnvelope {
            version: STORE_VERSION,
            settings: rows.values().cloned().collect(),
        };
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);
        {
            let mut writer = BufWriter::new(File::create(&temp)?);
            serde_json::to_writer_pretty(&mut writer, &envelope)?;
            writer.flush()?;
        }
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl SettingsBackend for FileBackend {
    fn fetch(
        &self,
        category: SettingCategory,
        key: &str,
    ) -> Result<Option<StoredSetting>, BackendError> {
        Ok(self.rows.lock().get(&(category, key.to_owned())).cloned())
    }

    fn list(&self, category: Option<SettingCategory>) -> Result<Vec<StoredSetting>, BackendError> {
        Ok(list_rows(&self.rows.lock(), category))
    }

    fn upsert(&self, row: StoredSetting) -> Result<(), BackendError> {
        self.mutate(|rows| {
            rows.insert(row_key(&row), row);
        })
    }

    fn insert_if_absent(&self, row: StoredSetting) -> Result<bool, BackendError> {
        let key = row_key(&row);
        if self.rows.lock().contains_key(&key) {
            return Ok(false);
        }
        self.mutate(|rows| {
            if rows.contains_key(&key) {
                return false;
            }
            rows.insert(key, row);
            true
        })
    }

    fn remove(&self, category: SettingCategory, key: &str) -> Result<bool, BackendError> {
        let key = (category, key.to_owned());
        if !self.rows.lock().contains_key(&key) {
            return Ok(false);
        }
        self.mutate(|rows| rows.shift_remove(&key).is_some())
    }
}
