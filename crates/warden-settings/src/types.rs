//! ---
//! warden_section: "07-settings-governance"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Settings governance store, validation, and backends."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use warden_security::SettingCategory;

/// Declared type of a setting value. Governs validation only; values are
/// always carried as strings.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum SettingType {
    #[default]
    String,
    Number,
    Boolean,
    Json,
    Encrypted,
}

/// Caller-facing setting. `value` is always plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub category: SettingCategory,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub setting_type: SettingType,
    pub encrypted: bool,
    pub updated_at: DateTime<Utc>,
}

/// Row as held by a backend. `value` is ciphertext when `encrypted` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSetting {
    pub category: SettingCategory,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub setting_type: SettingType,
    pub encrypted: bool,
    pub updated_at: DateTime<Utc>,
}

impl StoredSetting {
    pub(crate) fn into_setting(self, value: String) -> Setting {
        Setting {
            category: self.category,
            key: self.key,
            value,
            setting_type: self.setting_type,
            encrypted: self.encrypted,
            updated_at: self.updated_at,
        }
    }
}

/// Type and encryption flags for a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutOptions {
    #[serde(default, rename = "type")]
    pub setting_type: SettingType,
    #[serde(default)]
    pub encrypted: bool,
}

impl PutOptions {
    pub fn typed(setting_type: SettingType) -> Self {
        Self {
            setting_type,
            encrypted: false,
        }
    }

    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }

    /// `ENCRYPTED` values are always sealed, whatever the flag says.
    pub fn requires_encryption(&self) -> bool {
        self.encrypted || self.setting_type == SettingType::Encrypted
    }
}

/// One entry of a batch write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub key: String,
    pub value: String,
    #[serde(flatten)]
    pub options: PutOptions,
}

impl BatchEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>, options: PutOptions) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            options,
        }
    }
}

/// Result of a batch write: successes in input order, one message per failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub updated: Vec<Setting>,
    pub errors: Vec<String>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}
