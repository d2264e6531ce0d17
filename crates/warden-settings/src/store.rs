//! ---
//! warden_section: "07-settings-governance"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Settings governance store, validation, and backends."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Category-gated settings store.
//!
//! Every operation checks the category gate before touching the backend.
//! Values cross this boundary as plaintext; ciphertext only lives in
//! [`StoredSetting`] rows.

use std::str::FromStr;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use warden_logging::{
    log_access_event, log_system_event, AccessOutcome, LogContext, SystemEventOutcome,
};
use warden_security::{
    AuditEvent, AuditLog, CategoryAccessTable, Role, SecurityMetrics, SettingCategory,
    SettingsCipher,
};

use crate::backend::SettingsBackend;
use crate::defaults::DEFAULT_SETTINGS;
use crate::error::{Result, SettingsError};
use crate::transfer::{parse_import, SettingsExport};
use crate::types::{BatchEntry, BatchOutcome, PutOptions, Setting, StoredSetting};
use crate::validation::{parse_bool, parse_number, validate};

/// Scope name used in access errors for export and import.
const TRANSFER_SCOPE: &str = "settings transfer";

/// Stands in for values bound for encrypted rows in errors.
const REDACTED: &str = "[redacted]";

/// Governs reads and writes of configuration settings.
pub struct SettingsStore {
    backend: Box<dyn SettingsBackend>,
    categories: CategoryAccessTable,
    cipher: Option<SettingsCipher>,
    audit: Option<Mutex<AuditLog>>,
    metrics: Option<SecurityMetrics>,
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("categories", &self.categories)
            .field("cipher", &self.cipher)
            .field("audit", &self.audit.is_some())
            .finish()
    }
}

impl SettingsStore {
    pub fn new(backend: impl SettingsBackend + 'static, categories: CategoryAccessTable) -> Self {
        Self {
            backend: Box::new(backend),
            categories,
            cipher: None,
            audit: None,
            metrics: None,
        }
    }

    /// Enable at-rest encryption.
    pub fn with_cipher(mut self, cipher: SettingsCipher) -> Self {
        tracing::info!(
            key_fingerprint = %&cipher.fingerprint()[..16],
            "settings encryption enabled"
        );
        self.cipher = Some(cipher);
        self
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(Mutex::new(audit));
        self
    }

    pub fn with_metrics(mut self, metrics: SecurityMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn categories(&self) -> &CategoryAccessTable {
        &self.categories
    }

    /// Fail-closed lookup; names that are not categories deny.
    pub fn has_category_access(&self, role: Role, category: &str) -> bool {
        self.categories.allows_named(role, category)
    }

    /// Read one setting. A missing row is `Ok(None)`.
    pub fn get(&self, category: &str, key: &str, role: Role) -> Result<Option<Setting>> {
        let category = self.authorize(role, category, Some(key), "settings.get")?;
        self.backend
            .fetch(category, key)?
            .map(|row| self.reveal(row))
            .transpose()
    }

    /// Read every setting in a category.
    pub fn get_all(&self, category: &str, role: Role) -> Result<Vec<Setting>> {
        let category = self.authorize(role, category, None, "settings.get_all")?;
        self.backend
            .list(Some(category))?
            .into_iter()
            .map(|row| self.reveal(row))
            .collect()
    }

    /// Create or replace a setting, returning its plaintext form.
    pub fn put(
        &self,
        category: &str,
        key: &str,
        value: &str,
        role: Role,
        options: PutOptions,
    ) -> Result<Setting> {
        let category = self.authorize(role, category, Some(key), "settings.put")?;
        self.write(category, key, value, role, options)
    }

    /// Remove a setting. Removing a missing key succeeds.
    pub fn delete(&self, category: &str, key: &str, role: Role) -> Result<()> {
        let category = self.authorize(role, category, Some(key), "settings.delete")?;
        if self.backend.remove(category, key)? {
            self.record_audit(
                Some(role),
                AuditEvent::SettingDeleted,
                &format!("{category}/{key}"),
                json!({}),
            );
        }
        Ok(())
    }

    /// Independent write per entry. Failures are reported per key and do not
    /// stop the remaining entries.
    pub fn batch_put(
        &self,
        category: &str,
        entries: impl IntoIterator<Item = BatchEntry>,
        role: Role,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for entry in entries {
            match self.put(category, &entry.key, &entry.value, role, entry.options) {
                Ok(setting) => outcome.updated.push(setting),
                Err(err) => outcome.errors.push(format!("{}: {err}", entry.key)),
            }
        }
        outcome
    }

    /// Seed the default table, skipping rows that already exist. Returns the
    /// number of rows written. Encrypted defaults are skipped while no key is
    /// configured.
    pub fn initialize_defaults(&self) -> Result<usize> {
        let mut seeded = 0;
        for default in DEFAULT_SETTINGS {
            let options = PutOptions::typed(default.setting_type);
            let value = if options.requires_encryption() {
                match &self.cipher {
                    Some(_) => self.seal(default.category, default.key, default.value)?,
                    None => {
                        tracing::warn!(
                            category = %default.category,
                            key = default.key,
                            "skipping encrypted default; no settings key configured"
                        );
                        continue;
                    }
                }
            } else {
                default.value.to_owned()
            };
            let row = StoredSetting {
                category: default.category,
                key: default.key.to_owned(),
                value,
                setting_type: default.setting_type,
                encrypted: options.requires_encryption(),
                updated_at: Utc::now(),
            };
            if self.backend.insert_if_absent(row)? {
                seeded += 1;
            }
        }
        if seeded > 0 {
            self.record_audit(None, AuditEvent::SettingsSeeded, "*", json!({ "rows": seeded }));
        }
        log_system_event(
            None,
            "settings.seed",
            &format!("seeded {seeded} default settings"),
            SystemEventOutcome::Success,
        );
        Ok(seeded)
    }

    /// Dump every setting as plaintext. Highest role only.
    pub fn export(&self, role: Role) -> Result<SettingsExport> {
        self.authorize_transfer(role, "settings.export")?;
        let settings = self
            .backend
            .list(None)?
            .into_iter()
            .map(|row| self.reveal(row))
            .collect::<Result<Vec<_>>>()?;
        self.record_audit(
            Some(role),
            AuditEvent::SettingsExported,
            "*",
            json!({ "rows": settings.len() }),
        );
        Ok(SettingsExport::new(settings))
    }

    /// Replay a payload through the regular write path. Highest role only.
    /// The payload is checked as a whole first: nothing is written when any
    /// entry is malformed, targets a category the role may not write, or needs
    /// a key that is not configured.
    pub fn import(&self, payload: &str, role: Role) -> Result<usize> {
        self.authorize_transfer(role, "settings.import")?;
        let entries = match parse_import(payload) {
            Ok(entries) => entries,
            Err(err) => {
                log_system_event(
                    Some(&LogContext::new().with_role(role.as_ref())),
                    "settings.import",
                    &err.to_string(),
                    SystemEventOutcome::Fault,
                );
                return Err(err);
            }
        };
        for entry in &entries {
            self.authorize(role, entry.category.as_ref(), Some(&entry.key), "settings.import")?;
        }
        if self.cipher.is_none() {
            let sealed = entries
                .iter()
                .find(|entry| entry.options.requires_encryption());
            if let Some(entry) = sealed {
                return Err(SettingsError::KeyUnavailable {
                    category: entry.category.to_string(),
                    key: entry.key.clone(),
                });
            }
        }

        let mut imported = 0;
        for entry in entries {
            self.put(
                entry.category.as_ref(),
                &entry.key,
                &entry.value,
                role,
                entry.options,
            )?;
            imported += 1;
        }
        self.record_audit(
            Some(role),
            AuditEvent::SettingsImported,
            "*",
            json!({ "rows": imported }),
        );
        log_system_event(
            Some(&LogContext::new().with_role(role.as_ref())),
            "settings.import",
            &format!("imported {imported} settings"),
            SystemEventOutcome::Success,
        );
        Ok(imported)
    }

    /// Read a `BOOLEAN`-shaped value. `Ok(None)` when absent or not a boolean.
    pub fn get_bool(&self, category: &str, key: &str, role: Role) -> Result<Option<bool>> {
        Ok(self
            .get(category, key, role)?
            .and_then(|setting| parse_bool(&setting.value)))
    }

    /// Read a `NUMBER`-shaped value. `Ok(None)` when absent or not a number.
    pub fn get_number(&self, category: &str, key: &str, role: Role) -> Result<Option<f64>> {
        Ok(self
            .get(category, key, role)?
            .and_then(|setting| parse_number(&setting.value)))
    }

    /// Read a `JSON` value. `Ok(None)` when absent or not valid JSON.
    pub fn get_json(
        &self,
        category: &str,
        key: &str,
        role: Role,
    ) -> Result<Option<serde_json::Value>> {
        Ok(self
            .get(category, key, role)?
            .and_then(|setting| serde_json::from_str(&setting.value).ok()))
    }

    fn authorize(
        &self,
        role: Role,
        category: &str,
        key: Option<&str>,
        event: &str,
    ) -> Result<SettingCategory> {
        let mut context = LogContext::new()
            .with_role(role.as_ref())
            .with_category(category);
        if let Some(key) = key {
            context = context.with_key(key);
        }
        let resolved = SettingCategory::from_str(category)
            .ok()
            .filter(|resolved| self.categories.allows(role, *resolved));
        match resolved {
            Some(resolved) => {
                log_access_event(
                    Some(&context),
                    event,
                    "category access granted",
                    AccessOutcome::Granted,
                );
                Ok(resolved)
            }
            None => {
                log_access_event(
                    Some(&context),
                    event,
                    "category access denied",
                    AccessOutcome::Denied,
                );
                if let Some(metrics) = &self.metrics {
                    metrics.inc_settings_access_denial();
                }
                Err(SettingsError::AccessDenied {
                    role,
                    scope: category.to_owned(),
                })
            }
        }
    }

    fn authorize_transfer(&self, role: Role, event: &str) -> Result<()> {
        let context = LogContext::new().with_role(role.as_ref());
        if role == Role::highest() {
            log_access_event(
                Some(&context),
                event,
                "transfer permitted",
                AccessOutcome::Granted,
            );
            return Ok(());
        }
        log_access_event(Some(&context), event, "transfer denied", AccessOutcome::Denied);
        if let Some(metrics) = &self.metrics {
            metrics.inc_settings_access_denial();
        }
        Err(SettingsError::AccessDenied {
            role,
            scope: TRANSFER_SCOPE.to_owned(),
        })
    }

    fn write(
        &self,
        category: SettingCategory,
        key: &str,
        value: &str,
        role: Role,
        options: PutOptions,
    ) -> Result<Setting> {
        if !validate(value, options.setting_type) {
            log_access_event(
                Some(
                    &LogContext::new()
                        .with_role(role.as_ref())
                        .with_category(category.as_ref())
                        .with_key(key),
                ),
                "settings.put",
                "value rejected by validation",
                AccessOutcome::Denied,
            );
            if let Some(metrics) = &self.metrics {
                metrics.inc_settings_validation_failure();
            }
            let value = if options.requires_encryption() {
                REDACTED
            } else {
                value
            };
            return Err(SettingsError::InvalidValue {
                category: category.to_string(),
                key: key.to_owned(),
                value: value.to_owned(),
                expected: options.setting_type,
            });
        }

        let encrypted = options.requires_encryption();
        let stored_value = if encrypted {
            self.seal(category, key, value)?
        } else {
            value.to_owned()
        };
        let row = StoredSetting {
            category,
            key: key.to_owned(),
            value: stored_value,
            setting_type: options.setting_type,
            encrypted,
            updated_at: Utc::now(),
        };
        self.backend.upsert(row.clone())?;
        self.record_audit(
            Some(role),
            AuditEvent::SettingWritten,
            &format!("{category}/{key}"),
            json!({ "type": options.setting_type.to_string(), "encrypted": encrypted }),
        );
        Ok(row.into_setting(value.to_owned()))
    }

    fn seal(&self, category: SettingCategory, key: &str, value: &str) -> Result<String> {
        let cipher = self.cipher.as_ref().ok_or_else(|| SettingsError::KeyUnavailable {
            category: category.to_string(),
            key: key.to_owned(),
        })?;
        cipher.encrypt(value).map_err(|source| SettingsError::Encryption {
            category: category.to_string(),
            key: key.to_owned(),
            source,
        })
    }

    fn reveal(&self, row: StoredSetting) -> Result<Setting> {
        if !row.encrypted {
            let value = row.value.clone();
            return Ok(row.into_setting(value));
        }
        let cipher = self.cipher.as_ref().ok_or_else(|| SettingsError::KeyUnavailable {
            category: row.category.to_string(),
            key: row.key.clone(),
        })?;
        match cipher.decrypt(&row.value) {
            Ok(plaintext) => Ok(row.into_setting(plaintext)),
            Err(source) => {
                warden_logging::warden_error!(
                    context = LogContext::new()
                        .with_category(row.category.as_ref())
                        .with_key(&row.key),
                    "settings decryption failed: {source}"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.inc_settings_decryption_failure();
                }
                Err(SettingsError::DecryptionFailure {
                    category: row.category.to_string(),
                    key: row.key,
                    source,
                })
            }
        }
    }

    fn record_audit(
        &self,
        role: Option<Role>,
        event: AuditEvent,
        target: &str,
        detail: serde_json::Value,
    ) {
        let Some(audit) = &self.audit else {
            return;
        };
        if let Err(err) = audit.lock().append(role, event, target, detail) {
            warden_logging::warden_error!(
                "failed to append audit entry {}: {err:#}",
                event.as_str()
            );
        }
    }
}
