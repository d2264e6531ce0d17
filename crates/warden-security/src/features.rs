//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Access policies, route gating, and cryptographic utilities."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Feature and navigation gates.
//!
//! Both tables are curated independently of the permission matrix: a role may
//! see a navigation entry and still be met with a narrower in-page check.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::Role;
use crate::rbac::{PermissionMatrix, RequiredPermission};

/// Map from feature key to the roles granted that feature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureTable {
    grants: BTreeMap<String, BTreeSet<Role>>,
}

impl FeatureTable {
    /// Build from `(feature key, granted roles)` pairs.
    pub fn new<K, R>(grants: impl IntoIterator<Item = (K, R)>) -> Self
    where
        K: Into<String>,
        R: IntoIterator<Item = Role>,
    {
        Self {
            grants: grants
                .into_iter()
                .map(|(key, roles)| (key.into(), roles.into_iter().collect()))
                .collect(),
        }
    }

    /// Returns true if `role` is granted `feature`. Unknown features deny.
    pub fn allows(&self, role: Role, feature: &str) -> bool {
        self.grants
            .get(feature)
            .map(|roles| roles.contains(&role))
            .unwrap_or(false)
    }

    /// Feature keys granted to `role`, sorted.
    pub fn features_for(&self, role: Role) -> Vec<&str> {
        self.grants
            .iter()
            .filter(|(_, roles)| roles.contains(&role))
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Whether `feature` is declared at all, regardless of grants.
    pub fn contains(&self, feature: &str) -> bool {
        self.grants.contains_key(feature)
    }

    pub(crate) fn grants(&self) -> &BTreeMap<String, BTreeSet<Role>> {
        &self.grants
    }

    /// Feature grants shipped with the product.
    pub fn builtin() -> Self {
        use Role::*;

        Self::new([
            ("task_management", vec![Cleaner, Supervisor, Manager, Owner]),
            ("photo_upload", vec![Cleaner, Supervisor, Manager, Owner]),
            ("checklists", vec![Cleaner, Supervisor, Manager, Owner]),
            ("quality_evaluation", vec![Supervisor, Manager, Owner]),
            ("team_overview", vec![Supervisor, Manager, Owner]),
            ("template_editor", vec![Manager, Owner]),
            ("financial_reports", vec![Manager, Owner]),
            ("advanced_analytics", vec![Manager, Owner]),
            ("integrations", vec![Manager, Owner]),
            ("user_management", vec![Manager, Owner]),
            ("payment_approval", vec![Owner]),
            ("client_portal", vec![Client]),
            ("client_feedback", vec![Client, Manager, Owner]),
            ("messaging", vec![Cleaner, Supervisor, Manager, Owner, Client]),
        ])
    }
}

/// Curated per-role list of navigation entry identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationTable {
    entries: HashMap<Role, Vec<String>>,
}

impl NavigationTable {
    pub fn new<S: Into<String>>(
        entries: impl IntoIterator<Item = (Role, Vec<S>)>,
    ) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(role, items)| (role, items.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    /// Navigation entries visible to `role`; empty when none are configured.
    pub fn accessible(&self, role: Role) -> &[String] {
        self.entries.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn entries(&self) -> &HashMap<Role, Vec<String>> {
        &self.entries
    }

    pub fn builtin() -> Self {
        Self::new([
            (
                Role::Cleaner,
                vec!["dashboard", "tasks", "properties", "messages"],
            ),
            (
                Role::Supervisor,
                vec![
                    "dashboard",
                    "tasks",
                    "properties",
                    "employees",
                    "reports",
                    "templates",
                    "messages",
                ],
            ),
            (
                Role::Manager,
                vec![
                    "dashboard",
                    "tasks",
                    "properties",
                    "employees",
                    "finance",
                    "reports",
                    "analytics",
                    "templates",
                    "integrations",
                    "users",
                    "settings",
                    "messages",
                ],
            ),
            (
                Role::Owner,
                vec![
                    "dashboard",
                    "tasks",
                    "properties",
                    "employees",
                    "finance",
                    "payments",
                    "reports",
                    "analytics",
                    "templates",
                    "integrations",
                    "users",
                    "settings",
                    "messages",
                ],
            ),
            (
                Role::Client,
                vec!["dashboard", "properties", "tasks", "invoices", "messages"],
            ),
        ])
    }
}

/// Visibility rule attached to a menu item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuRestriction {
    /// No restriction declared; the item is always shown.
    #[default]
    None,
    /// Shown when the role holds the permission.
    Permission(RequiredPermission),
    /// Shown when the role is granted the feature.
    Feature(String),
    /// Shown to the listed roles only.
    Roles(BTreeSet<Role>),
}

/// Applies [`MenuRestriction`]s against the permission matrix and feature table.
#[derive(Debug, Clone, Copy)]
pub struct MenuGate<'a> {
    matrix: &'a PermissionMatrix,
    features: &'a FeatureTable,
}

impl<'a> MenuGate<'a> {
    pub fn new(matrix: &'a PermissionMatrix, features: &'a FeatureTable) -> Self {
        Self { matrix, features }
    }

    pub fn permits(&self, role: Role, restriction: &MenuRestriction) -> bool {
        match restriction {
            MenuRestriction::None => true,
            MenuRestriction::Permission(required) => self.matrix.check(role, *required),
            MenuRestriction::Feature(feature) => self.features.allows(role, feature),
            MenuRestriction::Roles(roles) => roles.contains(&role),
        }
    }

    /// Keep the items whose restriction (as returned by `restriction`) admits `role`.
    pub fn filter<'i, T, F>(&self, role: Role, items: &'i [T], restriction: F) -> Vec<&'i T>
    where
        F: Fn(&T) -> &MenuRestriction,
    {
        items
            .iter()
            .filter(|item| self.permits(role, restriction(item)))
            .collect()
    }
}
