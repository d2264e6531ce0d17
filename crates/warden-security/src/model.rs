//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Access policies, route gating, and cryptographic utilities."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Fixed category of principal driving every authorization decision.
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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    /// Field staff executing cleaning tasks.
    Cleaner,
    /// Team lead reviewing and evaluating field work.
    Supervisor,
    /// Operations manager with finance and configuration access.
    Manager,
    /// Business owner; the highest-privilege role.
    Owner,
    /// External customer using the client portal.
    Client,
}

impl Role {
    /// Role required for operator-level actions such as settings export.
    pub const fn highest() -> Self {
        Role::Owner
    }

    /// Progressive-disclosure tier for UI purposes only. Never use this as an
    /// authorization check.
    pub const fn capability_level(self) -> CapabilityLevel {
        match self {
            Role::Cleaner | Role::Client => CapabilityLevel::Basic,
            Role::Supervisor => CapabilityLevel::Intermediate,
            Role::Manager => CapabilityLevel::Advanced,
            Role::Owner => CapabilityLevel::Admin,
        }
    }
}

/// Named business area subject to permission checks.
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
pub enum Module {
    /// Cleaning tasks and their lifecycle.
    Tasks,
    /// Managed properties and sites.
    Properties,
    /// Staff records and evaluations.
    Employees,
    /// Invoices, revenue and financial reports.
    Finance,
    /// Operational reporting.
    Reports,
    /// Dashboards beyond standard reports.
    Analytics,
    /// Third-party connections.
    Integrations,
    /// Organisation settings screens.
    Settings,
    /// User accounts and role assignment.
    Users,
    /// Payment records and approvals.
    Payments,
    /// Landing dashboard.
    Dashboard,
    /// Task and checklist templates.
    Templates,
    /// Shared application shell.
    Core,
    /// Manager workspace.
    Manager,
    /// Client portal.
    Client,
}

/// Operation verb checked against a [`Module`].
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
pub enum Action {
    /// Read access.
    View,
    /// Create new records.
    Create,
    /// Edit existing records.
    Update,
    /// Remove records.
    Delete,
    /// Sign off submitted work.
    Approve,
    /// Send submitted work back.
    Reject,
    /// Download or export data.
    Export,
    /// Change configuration.
    Configure,
    /// Invite, edit and deactivate users.
    ManageUsers,
    /// Open analytics views.
    AccessAnalytics,
    /// See financial figures.
    ViewFinance,
    /// Release payments.
    ApprovePayment,
    /// Attach photos to tasks.
    UploadPhoto,
    /// Complete checklists.
    Checklist,
    /// Leave client feedback.
    Feedback,
    /// Perform quality audits.
    Audit,
    /// Send messages.
    Message,
    /// Score staff performance.
    Evaluate,
    /// Change templates.
    EditTemplates,
    /// Connect and configure integrations.
    ManageIntegrations,
    /// Enter the module at all.
    Access,
}

/// UI disclosure tier derived from a [`Role`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CapabilityLevel {
    Basic,
    Intermediate,
    Advanced,
    Admin,
}

/// Already-authenticated caller as handed over by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Role resolved from a verified session.
    pub role: Role,
}

impl Principal {
    pub fn new(role: Role) -> Self {
        Self { role }
    }
}

impl From<Role> for Principal {
    fn from(role: Role) -> Self {
        Self::new(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn names_use_snake_case() {
        assert_eq!(Action::ManageUsers.to_string(), "manage_users");
        assert_eq!(Module::Dashboard.as_ref(), "dashboard");
        assert_eq!(Action::from_str("approve_payment").unwrap(), Action::ApprovePayment);
        assert_eq!(Role::from_str("Manager").unwrap(), Role::Manager);
        assert!(Role::from_str("admin").is_err());
    }

    #[test]
    fn capability_levels_are_fixed_per_role() {
        assert_eq!(Role::Cleaner.capability_level(), CapabilityLevel::Basic);
        assert_eq!(Role::Client.capability_level(), CapabilityLevel::Basic);
        assert_eq!(Role::Supervisor.capability_level(), CapabilityLevel::Intermediate);
        assert_eq!(Role::Manager.capability_level(), CapabilityLevel::Advanced);
        assert_eq!(Role::Owner.capability_level(), CapabilityLevel::Admin);
        assert_eq!(Role::highest(), Role::Owner);
    }

    #[test]
    fn enumerations_are_complete() {
        assert_eq!(Role::iter().count(), 5);
        assert_eq!(Module::iter().count(), 15);
        assert_eq!(Action::iter().count(), 21);
    }
}
