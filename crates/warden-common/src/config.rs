//! ---
//! warden_section: "01-core-functionality"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Shared configuration and tracing primitives."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_access_log() -> bool {
    true
}

fn default_store_path() -> PathBuf {
    PathBuf::from("target/settings.json")
}

fn default_key_env_var() -> String {
    "WARDEN_SETTINGS_KEY".to_owned()
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("target/audit.log")
}

/// Primary configuration object for Warden binaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no file was found and defaults are in effect.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "WARDEN_CONFIG";

    /// Load configuration from disk, respecting the `WARDEN_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        let loaded = Self::load_with_source(candidates)?;
        match loaded.source {
            Some(_) => Ok(loaded.config),
            None => Err(anyhow!(
                "no configuration files found. inspected: {}",
                candidates
                    .iter()
                    .map(|p| p.as_ref().display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }

    /// Load configuration together with the effective source path. Falls back
    /// to defaults when neither the override nor any candidate exists.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!("no configuration file found; using defaults");
        Ok(LoadedAppConfig {
            config: Self::default(),
            source: None,
        })
    }

    /// Parse and validate a specific file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Audit log location when auditing is enabled.
    pub fn audit_path(&self) -> Option<&Path> {
        self.audit.enabled.then_some(self.audit.path.as_path())
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;
        if let Some(path) = &self.policy.path {
            if !path.is_file() {
                return Err(anyhow!(
                    "policy file {} does not exist or is not a file",
                    path.display()
                ));
            }
        }
        if self.audit.enabled && self.audit.path.as_os_str().is_empty() {
            return Err(anyhow!("audit.path must be set when auditing is enabled"));
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Also write `warden::access` events to their own daily file.
    #[serde(default = "default_access_log")]
    pub access_log: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            access_log: default_access_log(),
        }
    }
}

/// Where the access policy document lives. The built-in policy applies when unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolicyConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsConfig {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Environment variable holding the hex-encoded settings key.
    #[serde(default = "default_key_env_var")]
    pub key_env_var: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            key_env_var: default_key_env_var(),
        }
    }
}

impl SettingsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.store_path.as_os_str().is_empty() {
            return Err(anyhow!("settings.store_path must not be empty"));
        }
        let name = self.key_env_var.trim();
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            return Err(anyhow!(
                "settings.key_env_var `{}` is not a valid environment variable name",
                self.key_env_var
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditConfig {
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: default_audit_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.settings.key_env_var, "WARDEN_SETTINGS_KEY");
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
        assert_eq!(config.audit_path(), Some(Path::new("target/audit.log")));
    }

    #[test]
    fn parses_every_section() {
        let dir = tempfile::tempdir().unwrap();
        let policy = dir.path().join("policy.toml");
        fs::write(&policy, "").unwrap();
        let raw = format!(
            r#"
            [logging]
            directory = "/var/log/warden"
            format = "pretty"
            file_prefix = "ops"

            [policy]
            path = "{}"

            [settings]
            store_path = "/var/lib/warden/settings.json"
            key_env_var = "OPS_SETTINGS_KEY"

            [audit]
            enabled = false
            "#,
            policy.display()
        );
        let config = AppConfig::from_str(&raw).unwrap();
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.file_prefix.as_deref(), Some("ops"));
        assert_eq!(config.policy.path.as_deref(), Some(policy.as_path()));
        assert_eq!(config.settings.key_env_var, "OPS_SETTINGS_KEY");
        assert!(config.audit_path().is_none());
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(AppConfig::from_str("[settings]\nkey_env_var = \"\"").is_err());
        assert!(AppConfig::from_str("[settings]\nkey_env_var = \"A=B\"").is_err());
        assert!(AppConfig::from_str("[policy]\npath = \"/definitely/missing.toml\"").is_err());
        assert!(AppConfig::from_str("[logging]\nformat = \"xml\"").is_err());
    }

    #[test]
    fn candidates_are_tried_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join("warden.toml");
        fs::write(&present, "[settings]\nstore_path = \"custom.json\"\n").unwrap();

        let loaded = AppConfig::load_with_source(&[&missing, &present]).unwrap();
        if std::env::var(AppConfig::ENV_CONFIG_PATH).is_err() {
            assert_eq!(loaded.source.as_deref(), Some(present.as_path()));
            assert_eq!(loaded.config.settings.store_path, PathBuf::from("custom.json"));

            let fallback = AppConfig::load_with_source(&[&missing]).unwrap();
            assert!(fallback.source.is_none());
            assert!(AppConfig::load(&[&missing]).is_err());
        }
    }
}
