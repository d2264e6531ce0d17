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
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use strum::IntoEnumIterator;

use crate::model::{Action, Module, Role};
use crate::policy::PolicyError;

/// Actions a role may perform on one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Business area the actions apply to.
    pub module: Module,
    /// Granted actions.
    pub actions: BTreeSet<Action>,
}

impl Permission {
    pub fn new(module: Module, actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            module,
            actions: actions.into_iter().collect(),
        }
    }

    /// Grant every known action on `module`.
    pub fn all(module: Module) -> Self {
        Self::new(module, Action::iter())
    }

    pub fn allows(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}

/// Ordered list of [`Permission`]s with at most one entry per module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(Vec<Permission>);

impl PermissionSet {
    /// Build a set, rejecting duplicate module entries.
    pub fn new(permissions: Vec<Permission>) -> Result<Self, PolicyError> {
        let mut seen = BTreeSet::new();
        for permission in &permissions {
            if !seen.insert(permission.module) {
                return Err(PolicyError::DuplicateModule(permission.module));
            }
        }
        Ok(Self(permissions))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Entry for `module`, if the set grants anything on it.
    pub fn entry(&self, module: Module) -> Option<&Permission> {
        self.0.iter().find(|permission| permission.module == module)
    }

    pub fn allows(&self, module: Module, action: Action) -> bool {
        self.entry(module)
            .map(|permission| permission.allows(action))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A `(module, action)` pair, written as `module:action` in policy files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct RequiredPermission {
    pub module: Module,
    pub action: Action,
}

impl RequiredPermission {
    pub const fn new(module: Module, action: Action) -> Self {
        Self { module, action }
    }
}

impl fmt::Display for RequiredPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.action)
    }
}

impl FromStr for RequiredPermission {
    type Err = PolicyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || PolicyError::InvalidPermission(raw.to_owned());
        let (module, action) = raw.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            module: Module::from_str(module.trim()).map_err(|_| invalid())?,
            action: Action::from_str(action.trim()).map_err(|_| invalid())?,
        })
    }
}

/// Total mapping from [`Role`] to its [`PermissionSet`].
#[derive(Debug, Clone)]
pub struct PermissionMatrix {
    rows: HashMap<Role, PermissionSet>,
}

impl PermissionMatrix {
    /// Build a matrix from explicit rows. Roles without a row receive an empty
    /// set so every role is present.
    pub fn new(
        rows: impl IntoIterator<Item = (Role, PermissionSet)>,
    ) -> Result<Self, PolicyError> {
        let mut matrix = HashMap::new();
        for (role, set) in rows {
            if matrix.insert(role, set).is_some() {
                return Err(PolicyError::DuplicateRole(role));
            }
        }
        for role in Role::iter() {
            matrix.entry(role).or_insert_with(PermissionSet::empty);
        }
        Ok(Self { rows: matrix })
    }

    /// Decide whether `role` may perform `action` on `module`. Unknown roles,
    /// modules without an entry, and missing actions all deny.
    pub fn has_permission(&self, role: Role, module: Module, action: Action) -> bool {
        self.rows
            .get(&role)
            .map(|set| set.allows(module, action))
            .unwrap_or(false)
    }

    pub fn check(&self, role: Role, required: RequiredPermission) -> bool {
        self.has_permission(role, required.module, required.action)
    }

    pub fn permissions(&self, role: Role) -> Option<&PermissionSet> {
        self.rows.get(&role)
    }

    /// Matrix shipped with the product.
    pub fn builtin() -> Self {
        use Action::*;

        let cleaner = vec![
            Permission::new(Module::Dashboard, [View]),
            Permission::new(Module::Tasks, [View, Update, UploadPhoto, Checklist, Message]),
            Permission::new(Module::Properties, [View]),
            Permission::new(Module::Templates, [View]),
            Permission::new(Module::Core, [Access]),
        ];
        let supervisor = vec![
            Permission::new(Module::Dashboard, [View]),
            Permission::new(
                Module::Tasks,
                [
                    View,
                    Create,
                    Update,
                    Approve,
                    Reject,
                    UploadPhoto,
                    Checklist,
                    Audit,
                    Evaluate,
                    Message,
                ],
            ),
            Permission::new(Module::Properties, [View]),
            Permission::new(Module::Employees, [View, Evaluate]),
            Permission::new(Module::Reports, [View]),
            Permission::new(Module::Templates, [View]),
            Permission::new(Module::Core, [Access]),
        ];
        let manager = vec![
            Permission::new(Module::Dashboard, [View]),
            Permission::new(
                Module::Tasks,
                [
                    View,
                    Create,
                    Update,
                    Delete,
                    Approve,
                    Reject,
                    Export,
                    UploadPhoto,
                    Checklist,
                    Audit,
                    Evaluate,
                    Message,
                ],
            ),
            Permission::new(Module::Properties, [View, Create, Update, Delete, Export]),
            Permission::new(Module::Employees, [View, Create, Update, Evaluate]),
            Permission::new(Module::Finance, [View, ViewFinance, Export, ApprovePayment]),
            Permission::new(Module::Payments, [View, ApprovePayment]),
            Permission::new(Module::Reports, [View, Export]),
            Permission::new(Module::Analytics, [View, AccessAnalytics]),
            Permission::new(Module::Integrations, [View, ManageIntegrations]),
            Permission::new(Module::Settings, [View, Configure]),
            Permission::new(Module::Users, [View, ManageUsers]),
            Permission::new(Module::Templates, [View, Create, Update, EditTemplates]),
            Permission::new(Module::Core, [Access]),
            Permission::new(Module::Manager, [Access]),
        ];
        let owner = Module::iter().map(Permission::all).collect();
        let client = vec![
            Permission::new(Module::Dashboard, [View]),
            Permission::new(Module::Tasks, [View, Feedback, Message]),
            Permission::new(Module::Properties, [View]),
            Permission::new(Module::Payments, [View]),
            Permission::new(Module::Reports, [View]),
            Permission::new(Module::Client, [Access]),
        ];

        let rows = HashMap::from([
            (Role::Cleaner, PermissionSet(cleaner)),
            (Role::Supervisor, PermissionSet(supervisor)),
            (Role::Manager, PermissionSet(manager)),
            (Role::Owner, PermissionSet(owner)),
            (Role::Client, PermissionSet(client)),
        ]);
        Self { rows }
    }
}

impl Default for PermissionMatrix {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_matrix_covers_core_permissions() {
        let matrix = PermissionMatrix::builtin();
        assert!(matrix.has_permission(Role::Cleaner, Module::Tasks, Action::UploadPhoto));
        assert!(!matrix.has_permission(Role::Cleaner, Module::Tasks, Action::Delete));
        assert!(!matrix.has_permission(Role::Cleaner, Module::Finance, Action::View));
        assert!(matrix.has_permission(Role::Manager, Module::Finance, Action::ViewFinance));
        assert!(matrix.has_permission(Role::Client, Module::Tasks, Action::Feedback));
        assert!(!matrix.has_permission(Role::Client, Module::Finance, Action::View));
    }

    #[test]
    fn owner_holds_every_action() {
        let matrix = PermissionMatrix::builtin();
        for module in Module::iter() {
            for action in Action::iter() {
                assert!(matrix.has_permission(Role::Owner, module, action));
            }
        }
    }

    #[test]
    fn builtin_sets_pass_validation() {
        let matrix = PermissionMatrix::builtin();
        for role in Role::iter() {
            let set = matrix.permissions(role).unwrap();
            PermissionSet::new(set.iter().cloned().collect()).unwrap();
        }
    }

    #[test]
    fn has_permission_matches_row_contents() {
        let matrix = PermissionMatrix::builtin();
        for role in Role::iter() {
            let row = matrix.permissions(role).unwrap();
            for module in Module::iter() {
                for action in Action::iter() {
                    let expected = row
                        .entry(module)
                        .map(|entry| entry.actions.contains(&action))
                        .unwrap_or(false);
                    assert_eq!(matrix.has_permission(role, module, action), expected);
                }
            }
        }
    }

    #[test]
    fn roles_without_rows_are_denied_everything() {
        let set = PermissionSet::new(vec![Permission::new(Module::Tasks, [Action::View])]).unwrap();
        let matrix = PermissionMatrix::new([(Role::Manager, set)]).unwrap();
        assert!(matrix.has_permission(Role::Manager, Module::Tasks, Action::View));
        assert!(!matrix.has_permission(Role::Owner, Module::Tasks, Action::View));
        assert!(matrix.permissions(Role::Owner).unwrap().is_empty());
    }

    #[test]
    fn duplicate_modules_are_rejected() {
        let err = PermissionSet::new(vec![
            Permission::new(Module::Tasks, [Action::View]),
            Permission::new(Module::Tasks, [Action::Create]),
        ])
        .unwrap_err();
        assert!(matches!(err, PolicyError::DuplicateModule(Module::Tasks)));
    }

    #[test]
    fn duplicate_roles_are_rejected() {
        let err = PermissionMatrix::new([
            (Role::Cleaner, PermissionSet::empty()),
            (Role::Cleaner, PermissionSet::empty()),
        ])
        .unwrap_err();
        assert!(matches!(err, PolicyError::DuplicateRole(Role::Cleaner)));
    }

    #[test]
    fn required_permission_parses_module_action_pairs() {
        let parsed: RequiredPermission = "finance:view_finance".parse().unwrap();
        assert_eq!(parsed, RequiredPermission::new(Module::Finance, Action::ViewFinance));
        assert_eq!(parsed.to_string(), "finance:view_finance");
        assert!("finance".parse::<RequiredPermission>().is_err());
        assert!("finance:fly".parse::<RequiredPermission>().is_err());
    }
}
