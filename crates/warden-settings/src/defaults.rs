//! ---
//! warden_section: "07-settings-governance"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Settings governance store, validation, and backends."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use warden_security::SettingCategory;

use crate::types::SettingType;

/// A row of the static default table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultSetting {
    pub category: SettingCategory,
    pub key: &'static str,
    pub value: &'static str,
    pub setting_type: SettingType,
}

const fn default(
    category: SettingCategory,
    key: &'static str,
    value: &'static str,
    setting_type: SettingType,
) -> DefaultSetting {
    DefaultSetting {
        category,
        key,
        value,
        setting_type,
    }
}

/// Rows seeded by `SettingsStore::initialize_defaults`.
pub const DEFAULT_SETTINGS: &[DefaultSetting] = &[
    default(SettingCategory::General, "company_name", "", SettingType::String),
    default(SettingCategory::General, "timezone", "UTC", SettingType::String),
    default(SettingCategory::General, "currency", "USD", SettingType::String),
    default(SettingCategory::General, "language", "en", SettingType::String),
    default(
        SettingCategory::Permissions,
        "supervisors_can_approve_tasks",
        "true",
        SettingType::Boolean,
    ),
    default(
        SettingCategory::Permissions,
        "cleaners_can_message_clients",
        "false",
        SettingType::Boolean,
    ),
    default(
        SettingCategory::Integrations,
        "payment_api_key",
        "",
        SettingType::Encrypted,
    ),
    default(SettingCategory::Integrations, "webhook_url", "", SettingType::String),
    default(SettingCategory::Appearance, "theme", "light", SettingType::String),
    default(SettingCategory::Appearance, "primary_color", "#2563eb", SettingType::String),
    default(
        SettingCategory::Security,
        "session_timeout_minutes",
        "60",
        SettingType::Number,
    ),
    default(SettingCategory::Security, "password_min_length", "8", SettingType::Number),
    default(
        SettingCategory::Security,
        "two_factor_required",
        "false",
        SettingType::Boolean,
    ),
    default(SettingCategory::Notifications, "email_enabled", "true", SettingType::Boolean),
    default(SettingCategory::Notifications, "sms_enabled", "false", SettingType::Boolean),
    default(
        SettingCategory::Notifications,
        "digest_schedule",
        r#"{"frequency":"daily","hour":8}"#,
        SettingType::Json,
    ),
    default(SettingCategory::Finance, "tax_rate", "0", SettingType::Number),
    default(SettingCategory::Finance, "invoice_prefix", "INV-", SettingType::String),
    default(SettingCategory::Finance, "payment_terms_days", "30", SettingType::Number),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[test]
    fn defaults_are_valid_and_unique() {
        let mut seen = HashSet::new();
        for row in DEFAULT_SETTINGS {
            assert!(validate(row.value, row.setting_type), "{}", row.key);
            assert!(seen.insert((row.category, row.key)), "duplicate {}", row.key);
        }
    }

    #[test]
    fn every_category_has_defaults() {
        for category in SettingCategory::iter() {
            assert!(
                DEFAULT_SETTINGS.iter().any(|row| row.category == category),
                "{category}"
            );
        }
    }
}
