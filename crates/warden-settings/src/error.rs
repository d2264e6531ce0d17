//! ---
//! warden_section: "07-settings-governance"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Settings governance store, validation, and backends."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use thiserror::Error;
use warden_security::{CryptoError, Role};

use crate::backend::BackendError;
use crate::types::SettingType;

/// Result alias used throughout the settings crate.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Error type for settings governance operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The role may not touch the category (or perform the operation).
    #[error("role `{role}` is not permitted to access `{scope}`")]
    AccessDenied { role: Role, scope: String },
    /// The value does not satisfy its declared type.
    #[error("invalid value `{value}` for `{category}/{key}`: expected {expected}")]
    InvalidValue {
        category: String,
        key: String,
        value: String,
        expected: SettingType,
    },
    /// A stored ciphertext could not be opened.
    #[error("failed to decrypt `{category}/{key}`")]
    DecryptionFailure {
        category: String,
        key: String,
        #[source]
        source: CryptoError,
    },
    /// Encryption was required but no key is configured.
    #[error("no settings key configured; `{category}/{key}` cannot be sealed or opened")]
    KeyUnavailable { category: String, key: String },
    /// Import payload rejected as a whole.
    #[error("malformed import payload: {0}")]
    MalformedImport(String),
    /// Sealing a value failed.
    #[error("failed to encrypt `{category}/{key}`")]
    Encryption {
        category: String,
        key: String,
        #[source]
        source: CryptoError,
    },
    /// Storage failure.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SettingsError {
    /// Expected, user-facing outcomes that are never logged as application errors.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            SettingsError::AccessDenied { .. } | SettingsError::InvalidValue { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_entry() {
        let err = SettingsError::InvalidValue {
            category: "finance".into(),
            key: "tax_rate".into(),
            value: "abc".into(),
            expected: SettingType::Number,
        };
        assert_eq!(
            err.to_string(),
            "invalid value `abc` for `finance/tax_rate`: expected NUMBER"
        );
        assert!(err.is_user_facing());

        let denied = SettingsError::AccessDenied {
            role: Role::Cleaner,
            scope: "finance".into(),
        };
        assert_eq!(
            denied.to_string(),
            "role `cleaner` is not permitted to access `finance`"
        );
        assert!(!SettingsError::MalformedImport("x".into()).is_user_facing());
    }
}
