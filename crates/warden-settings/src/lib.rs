//! ---
//! warden_section: "07-settings-governance"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Settings governance store, validation, and backends."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Settings governance for Warden: category-scoped key/value configuration
//! with per-category role gating, typed validation and at-rest encryption.

pub mod backend;
pub mod defaults;
pub mod error;
pub mod store;
pub mod transfer;
pub mod types;
pub mod validation;

pub use backend::{BackendError, FileBackend, MemoryBackend, SettingsBackend};
pub use defaults::{DefaultSetting, DEFAULT_SETTINGS};
pub use error::{Result, SettingsError};
pub use store::SettingsStore;
pub use transfer::{parse_import, ImportEntry, SettingsExport, EXPORT_VERSION};
pub use types::{BatchEntry, BatchOutcome, PutOptions, Setting, SettingType, StoredSetting};
pub use validation::validate;
