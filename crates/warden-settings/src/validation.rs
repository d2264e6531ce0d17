//! ---
//! warden_section: "07-settings-governance"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Settings governance store, validation, and backends."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use crate::types::SettingType;

/// Check `value` against its declared type.
///
/// * `BOOLEAN` accepts `true`/`false` in any case.
/// * `NUMBER` accepts finite base-10 numbers, surrounding whitespace allowed.
/// * `JSON` accepts any well-formed JSON document.
/// * `STRING` and `ENCRYPTED` accept everything.
pub fn validate(value: &str, setting_type: SettingType) -> bool {
    match setting_type {
        SettingType::Boolean => parse_bool(value).is_some(),
        SettingType::Number => parse_number(value).is_some(),
        SettingType::Json => serde_json::from_str::<serde_json::Value>(value).is_ok(),
        SettingType::String | SettingType::Encrypted => true,
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

pub(crate) fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    // f64 parsing also accepts "inf" and "nan"; neither is a base-10 literal.
    let non_numeric = |c: char| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E');
    if trimmed.is_empty() || trimmed.chars().any(non_numeric) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|number| number.is_finite())
}
