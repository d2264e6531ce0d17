//! ---
//! warden_section: "07-settings-governance"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Settings governance store, validation, and backends."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_security::SettingCategory;

use crate::error::{Result, SettingsError};
use crate::types::{PutOptions, Setting, SettingType};
use crate::validation::validate;

/// Current export document version.
pub const EXPORT_VERSION: u16 = 1;

/// Plaintext dump of every setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsExport {
    pub version: u16,
    pub exported_at: DateTime<Utc>,
    pub settings: Vec<Setting>,
}

impl SettingsExport {
    pub fn new(settings: Vec<Setting>) -> Self {
        Self {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            settings,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Import entry as written by callers; unknown fields such as `updated_at`
/// are ignored.
#[derive(Debug, Clone, Deserialize)]
struct RawEntry {
    category: String,
    key: String,
    value: String,
    #[serde(default, rename = "type")]
    setting_type: SettingType,
    #[serde(default)]
    encrypted: bool,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    version: u16,
    settings: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPayload {
    Document(RawDocument),
    Entries(Vec<RawEntry>),
}

/// Validated import entry, ready to be replayed through a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub category: SettingCategory,
    pub key: String,
    pub value: String,
    pub options: PutOptions,
}

/// Parse an import payload: either an export document or a bare array of
/// entries. Every entry is checked before anything is returned, so a single
/// bad entry rejects the whole payload.
pub fn parse_import(payload: &str) -> Result<Vec<ImportEntry>> {
    let raw: RawPayload = serde_json::from_str(payload)
        .map_err(|err| SettingsError::MalformedImport(err.to_string()))?;
    let entries = match raw {
        RawPayload::Document(document) => {
            if document.version == 0 || document.version > EXPORT_VERSION {
                return Err(SettingsError::MalformedImport(format!(
                    "unsupported document version {}",
                    document.version
                )));
            }
            document.settings
        }
        RawPayload::Entries(entries) => entries,
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let category = SettingCategory::from_str(&entry.category).map_err(|_| {
                SettingsError::MalformedImport(format!(
                    "entry {index}: unknown category `{}`",
                    entry.category
                ))
            })?;
            if entry.key.trim().is_empty() {
                return Err(SettingsError::MalformedImport(format!(
                    "entry {index}: empty key"
                )));
            }
            if !validate(&entry.value, entry.setting_type) {
                return Err(SettingsError::MalformedImport(format!(
                    "entry {index}: `{}/{}` is not a valid {}",
                    entry.category, entry.key, entry.setting_type
                )));
            }
            Ok(ImportEntry {
                category,
                key: entry.key,
                value: entry.value,
                options: PutOptions {
                    setting_type: entry.setting_type,
                    encrypted: entry.encrypted,
                },
            })
        })
        .collect()
}
