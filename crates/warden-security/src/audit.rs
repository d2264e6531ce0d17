//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Access policies, route gating, and cryptographic utilities."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::Role;

const GENESIS_HASH_LEN: usize = 64;

/// Governance event recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    SettingWritten,
    SettingDeleted,
    SettingsSeeded,
    SettingsExported,
    SettingsImported,
}

impl AuditEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEvent::SettingWritten => "setting.written",
            AuditEvent::SettingDeleted => "setting.deleted",
            AuditEvent::SettingsSeeded => "settings.seeded",
            AuditEvent::SettingsExported => "settings.exported",
            AuditEvent::SettingsImported => "settings.imported",
        }
    }
}

/// Entry recorded in the audit log. Never carries setting values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    /// Role of the principal that triggered the event, if any.
    pub role: Option<Role>,
    pub event: AuditEvent,
    /// Affected object, e.g. `finance/tax_rate`.
    pub target: String,
    #[serde(default)]
    pub detail: serde_json::Value,
    /// SHA-256 over the entry contents chained with `previous_hash`.
    pub hash: String,
    pub previous_hash: String,
}

impl AuditEntry {
    fn compute_hash(
        timestamp: DateTime<Utc>,
        role: Option<Role>,
        event: AuditEvent,
        target: &str,
        detail: &serde_json::Value,
        previous_hash: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(
            timestamp
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_be_bytes(),
        );
        let role = role.map(|role| role.to_string()).unwrap_or_else(|| "-".to_owned());
        hasher.update(role.as_bytes());
        hasher.update(event.as_str().as_bytes());
        hasher.update(target.as_bytes());
        hasher.update(detail.to_string().as_bytes());
        hasher.update(previous_hash.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn expected_hash(&self, previous_hash: &str) -> String {
        Self::compute_hash(
            self.timestamp,
            self.role,
            self.event,
            &self.target,
            &self.detail,
            previous_hash,
        )
    }
}

/// Hash-chained audit log backed by a newline-delimited JSON file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    last_hash: String,
}

impl AuditLog {
    /// Open (or create lazily) the log at `path`; existing entries set the head hash.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut log = Self {
            path,
            last_hash: "0".repeat(GENESIS_HASH_LEN),
        };
        if let Some(last) = log.entries()?.pop() {
            log.last_hash = last.hash;
        }
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &mut self,
        role: Option<Role>,
        event: AuditEvent,
        target: &str,
        detail: serde_json::Value,
    ) -> Result<AuditEntry> {
        let timestamp = Utc::now();
        let hash =
            AuditEntry::compute_hash(timestamp, role, event, target, &detail, &self.last_hash);
        let entry = AuditEntry {
            timestamp,
            role,
            event,
            target: target.to_owned(),
            detail,
            hash: hash.clone(),
            previous_hash: self.last_hash.clone(),
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("unable to open audit log {}", self.path.display()))?;
        file.write_all(serde_json::to_string(&entry)?.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        self.last_hash = hash;
        Ok(entry)
    }

    /// All entries currently on disk, oldest first.
    pub fn entries(&self) -> Result<Vec<AuditEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path)
            .with_context(|| format!("unable to read audit log {}", self.path.display()))?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }

    /// Verify the hash chain (detects tampering and reordering).
    pub fn verify(&self) -> Result<bool> {
        let mut previous = "0".repeat(GENESIS_HASH_LEN);
        for entry in self.entries()? {
            if entry.previous_hash != previous || entry.expected_hash(&previous) != entry.hash {
                return Ok(false);
            }
            previous = entry.hash;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn chain_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit").join("governance.log");
        let mut log = AuditLog::open(&path).unwrap();
        log.append(
            Some(Role::Manager),
            AuditEvent::SettingWritten,
            "finance/tax_rate",
            json!({"encrypted": false}),
        )
        .unwrap();

        let mut reopened = AuditLog::open(&path).unwrap();
        let second = reopened
            .append(Some(Role::Owner), AuditEvent::SettingsExported, "*", json!({"rows": 3}))
            .unwrap();
        assert_eq!(second.previous_hash, log.entries().unwrap()[0].hash);
        assert!(reopened.verify().unwrap());
        assert_eq!(reopened.entries().unwrap().len(), 2);
    }

    #[test]
    fn audit_log_detects_tampering() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let mut log = AuditLog::open(&path).unwrap();
        log.append(None, AuditEvent::SettingsSeeded, "*", json!({"rows": 4}))
            .unwrap();
        log.append(
            Some(Role::Owner),
            AuditEvent::SettingDeleted,
            "security/session_timeout_minutes",
            json!({}),
        )
        .unwrap();
        assert!(log.verify().unwrap());

        let contents = fs::read_to_string(&path).unwrap();
        let mut entries: Vec<serde_json::Value> = contents
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        entries[1]["target"] = json!("security/two_factor_required");
        let rewritten: String = entries
            .iter()
            .map(|value| format!("{value}\n"))
            .collect();
        fs::write(&path, rewritten).unwrap();
        assert!(!AuditLog::open(&path).unwrap().verify().unwrap());
    }
}
