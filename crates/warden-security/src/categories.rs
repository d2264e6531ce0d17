//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Access policies, route gating, and cryptographic utilities."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::model::Role;

/// Grouping of configuration keys sharing one access gate.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SettingCategory {
    General,
    Permissions,
    Integrations,
    Appearance,
    Security,
    Notifications,
    Finance,
}

/// Which roles may read or write each settings category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryAccessTable {
    grants: HashMap<SettingCategory, BTreeSet<Role>>,
}

impl CategoryAccessTable {
    pub fn new<R: IntoIterator<Item = Role>>(
        grants: impl IntoIterator<Item = (SettingCategory, R)>,
    ) -> Self {
        Self {
            grants: grants
                .into_iter()
                .map(|(category, roles)| (category, roles.into_iter().collect()))
                .collect(),
        }
    }

    /// Table lookup; categories without an entry deny every role.
    pub fn allows(&self, role: Role, category: SettingCategory) -> bool {
        self.grants
            .get(&category)
            .map(|roles| roles.contains(&role))
            .unwrap_or(false)
    }

    /// Same as [`Self::allows`] for a raw category name. Names that do not
    /// parse deny.
    pub fn allows_named(&self, role: Role, category: &str) -> bool {
        SettingCategory::from_str(category)
            .map(|category| self.allows(role, category))
            .unwrap_or(false)
    }

    pub fn roles(&self, category: SettingCategory) -> Option<&BTreeSet<Role>> {
        self.grants.get(&category)
    }

    pub(crate) fn grants(&self) -> &HashMap<SettingCategory, BTreeSet<Role>> {
        &self.grants
    }

    pub fn builtin() -> Self {
        use Role::*;

        Self::new([
            (SettingCategory::General, vec![Manager, Owner]),
            (SettingCategory::Permissions, vec![Owner]),
            (SettingCategory::Integrations, vec![Manager, Owner]),
            (SettingCategory::Appearance, vec![Supervisor, Manager, Owner]),
            (SettingCategory::Security, vec![Owner]),
            (
                SettingCategory::Notifications,
                vec![Cleaner, Supervisor, Manager, Owner, Client],
            ),
            (SettingCategory::Finance, vec![Manager, Owner]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn sensitive_categories_are_gated_above_cleaner() {
        let table = CategoryAccessTable::builtin();
        assert!(!table.allows(Role::Cleaner, SettingCategory::Finance));
        assert!(!table.allows(Role::Cleaner, SettingCategory::Security));
        assert!(table.allows(Role::Manager, SettingCategory::Finance));
        assert!(!table.allows(Role::Manager, SettingCategory::Security));
    }

    #[test]
    fn owner_reaches_every_category() {
        let table = CategoryAccessTable::builtin();
        for category in SettingCategory::iter() {
            assert!(table.allows(Role::Owner, category), "{category}");
        }
    }

    #[test]
    fn unknown_or_unlisted_categories_deny() {
        let table = CategoryAccessTable::builtin();
        assert!(!table.allows_named(Role::Owner, "payroll"));
        assert!(table.allows_named(Role::Owner, "finance"));

        let sparse = CategoryAccessTable::new([(SettingCategory::General, vec![Role::Owner])]);
        assert!(!sparse.allows(Role::Owner, SettingCategory::Security));
    }
}
