//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Access policies, route gating, and cryptographic utilities."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Route access evaluation.
//!
//! A request path is matched against the route table by longest prefix. The
//! evaluator is a pure function of `(principal, path)`; session validity is the
//! caller's concern.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::features::FeatureTable;
use crate::model::{Action, Module, Principal, Role};
use crate::policy::PolicyError;
use crate::rbac::{PermissionMatrix, RequiredPermission};

/// Default target for unauthenticated callers.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Access rule attached to a path prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePolicy {
    #[serde(rename = "path")]
    pub path_prefix: String,
    #[serde(default, rename = "roles", skip_serializing_if = "Option::is_none")]
    pub allowed_roles: Option<BTreeSet<Role>>,
    #[serde(default, rename = "permission", skip_serializing_if = "Option::is_none")]
    pub required_permission: Option<RequiredPermission>,
    #[serde(default, rename = "feature", skip_serializing_if = "Option::is_none")]
    pub required_feature: Option<String>,
    #[serde(default, rename = "redirect", skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

impl RoutePolicy {
    /// Policy for `path_prefix` with no restrictions; add them with the builders.
    pub fn new(path_prefix: impl Into<String>) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            allowed_roles: None,
            required_permission: None,
            required_feature: None,
            redirect_to: None,
        }
    }

    /// Admit only these roles.
    pub fn roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.allowed_roles = Some(roles.into_iter().collect());
        self
    }

    /// Require `module:action` in the permission matrix.
    pub fn permission(mut self, module: Module, action: Action) -> Self {
        self.required_permission = Some(RequiredPermission::new(module, action));
        self
    }

    /// Require the feature to be enabled for the caller's role.
    pub fn feature(mut self, feature: impl Into<String>) -> Self {
        self.required_feature = Some(feature.into());
        self
    }

    /// Turn denials on this prefix into a redirect to `target`.
    pub fn redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect_to = Some(target.into());
        self
    }
}

/// Paths reachable without an authenticated principal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicPaths {
    entries: Vec<String>,
}

impl PublicPaths {
    pub fn new<S: Into<String>>(entries: impl IntoIterator<Item = S>) -> Self {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// An entry matches itself and any path below it on a segment boundary.
    /// `/` only matches the root.
    pub fn matches(&self, path: &str) -> bool {
        self.entries.iter().any(|entry| {
            if path == entry {
                return true;
            }
            if entry == "/" {
                return false;
            }
            path.strip_prefix(entry.as_str())
                .map(|rest| rest.starts_with('/'))
                .unwrap_or(false)
        })
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// Why a route was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    RoleNotPermitted,
    PermissionMissing,
    FeatureNotEnabled,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DenyReason::RoleNotPermitted => "role not permitted",
            DenyReason::PermissionMissing => "permission missing",
            DenyReason::FeatureNotEnabled => "feature not enabled",
        })
    }
}

/// Outcome of [`RouteEvaluator::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RouteDecision {
    Allow,
    Deny {
        reason: DenyReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        allowed_roles: Option<BTreeSet<Role>>,
    },
    Redirect {
        target: String,
    },
}

impl RouteDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RouteDecision::Allow)
    }
}

/// Route policies ordered for longest-prefix matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    policies: Vec<RoutePolicy>,
    public: PublicPaths,
    login_path: String,
}

impl RouteTable {
    /// Validate and build a table. Prefixes must start with `/` and be unique,
    /// which rules out equal-length ties during matching.
    pub fn new(
        policies: Vec<RoutePolicy>,
        public: PublicPaths,
        login_path: impl Into<String>,
    ) -> Result<Self, PolicyError> {
        let mut seen = HashSet::new();
        for policy in &policies {
            if !policy.path_prefix.starts_with('/') {
                return Err(PolicyError::InvalidRoutePrefix(policy.path_prefix.clone()));
            }
            if !seen.insert(policy.path_prefix.as_str()) {
                return Err(PolicyError::DuplicateRoutePrefix(policy.path_prefix.clone()));
            }
        }
        let login_path = login_path.into();
        if !login_path.starts_with('/') {
            return Err(PolicyError::InvalidRoutePrefix(login_path));
        }
        Ok(Self::assemble(policies, public, login_path))
    }

    fn assemble(mut policies: Vec<RoutePolicy>, public: PublicPaths, login_path: String) -> Self {
        // Stable sort keeps declaration order among unrelated prefixes.
        policies.sort_by(|a, b| b.path_prefix.len().cmp(&a.path_prefix.len()));
        Self {
            policies,
            public,
            login_path,
        }
    }

    /// Policy with the longest prefix of `path`, if any.
    pub fn matching(&self, path: &str) -> Option<&RoutePolicy> {
        self.policies
            .iter()
            .find(|policy| path.starts_with(policy.path_prefix.as_str()))
    }

    pub fn policies(&self) -> &[RoutePolicy] {
        &self.policies
    }

    pub fn public_paths(&self) -> &PublicPaths {
        &self.public
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn builtin() -> Self {
        Self::assemble(
            builtin_policies(),
            PublicPaths::new(["/", "/login", "/forgot-password", "/reset-password", "/public"]),
            DEFAULT_LOGIN_PATH.to_owned(),
        )
    }
}

pub(crate) fn builtin_policies() -> Vec<RoutePolicy> {
    use Role::*;

    vec![
        RoutePolicy::new("/dashboard").permission(Module::Dashboard, Action::View),
        RoutePolicy::new("/tasks").permission(Module::Tasks, Action::View),
        RoutePolicy::new("/tasks/new")
            .permission(Module::Tasks, Action::Create)
            .redirect("/tasks"),
        RoutePolicy::new("/properties").permission(Module::Properties, Action::View),
        RoutePolicy::new("/properties/new")
            .permission(Module::Properties, Action::Create)
            .redirect("/properties"),
        RoutePolicy::new("/employees")
            .roles([Supervisor, Manager, Owner])
            .permission(Module::Employees, Action::View),
        RoutePolicy::new("/finance")
            .roles([Manager, Owner])
            .permission(Module::Finance, Action::ViewFinance),
        RoutePolicy::new("/finance/payments")
            .roles([Manager, Owner])
            .permission(Module::Payments, Action::ApprovePayment)
            .feature("payment_approval"),
        RoutePolicy::new("/reports").permission(Module::Reports, Action::View),
        RoutePolicy::new("/analytics")
            .roles([Manager, Owner])
            .permission(Module::Analytics, Action::AccessAnalytics)
            .feature("advanced_analytics"),
        RoutePolicy::new("/integrations")
            .roles([Manager, Owner])
            .permission(Module::Integrations, Action::ManageIntegrations)
            .feature("integrations"),
        RoutePolicy::new("/settings")
            .roles([Manager, Owner])
            .permission(Module::Settings, Action::Configure),
        RoutePolicy::new("/users")
            .roles([Manager, Owner])
            .permission(Module::Users, Action::ManageUsers),
        RoutePolicy::new("/templates").permission(Module::Templates, Action::View),
        RoutePolicy::new("/templates/edit")
            .permission(Module::Templates, Action::EditTemplates)
            .feature("template_editor"),
        RoutePolicy::new("/manager")
            .roles([Manager, Owner])
            .permission(Module::Manager, Action::Access)
            .redirect("/dashboard"),
        RoutePolicy::new("/client")
            .roles([Client])
            .permission(Module::Client, Action::Access)
            .redirect("/dashboard"),
    ]
}

/// Evaluates paths against a [`RouteTable`] using the permission matrix and
/// feature table as independent gates.
#[derive(Debug, Clone, Copy)]
pub struct RouteEvaluator<'a> {
    routes: &'a RouteTable,
    matrix: &'a PermissionMatrix,
    features: &'a FeatureTable,
}

impl<'a> RouteEvaluator<'a> {
    pub fn new(
        routes: &'a RouteTable,
        matrix: &'a PermissionMatrix,
        features: &'a FeatureTable,
    ) -> Self {
        Self {
            routes,
            matrix,
            features,
        }
    }

    pub fn evaluate(&self, principal: Option<&Principal>, path: &str) -> RouteDecision {
        let Some(principal) = principal else {
            if self.routes.public.matches(path) {
                return RouteDecision::Allow;
            }
            return RouteDecision::Redirect {
                target: self.routes.login_path.clone(),
            };
        };

        let Some(policy) = self.routes.matching(path) else {
            return RouteDecision::Allow;
        };

        let denial = self.check(principal.role, policy);
        match (denial, &policy.redirect_to) {
            (None, _) => RouteDecision::Allow,
            (Some(_), Some(target)) => RouteDecision::Redirect {
                target: target.clone(),
            },
            (Some(deny), None) => deny,
        }
    }

    fn check(&self, role: Role, policy: &RoutePolicy) -> Option<RouteDecision> {
        if let Some(roles) = &policy.allowed_roles {
            if !roles.contains(&role) {
                return Some(RouteDecision::Deny {
                    reason: DenyReason::RoleNotPermitted,
                    allowed_roles: Some(roles.clone()),
                });
            }
        }
        if let Some(required) = policy.required_permission {
            if !self.matrix.check(role, required) {
                return Some(RouteDecision::Deny {
                    reason: DenyReason::PermissionMissing,
                    allowed_roles: None,
                });
            }
        }
        if let Some(feature) = &policy.required_feature {
            if !self.features.allows(role, feature) {
                return Some(RouteDecision::Deny {
                    reason: DenyReason::FeatureNotEnabled,
                    allowed_roles: None,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate(role: Option<Role>, path: &str) -> RouteDecision {
        let routes = RouteTable::builtin();
        let matrix = PermissionMatrix::builtin();
        let features = FeatureTable::builtin();
        let principal = role.map(Principal::new);
        RouteEvaluator::new(&routes, &matrix, &features).evaluate(principal.as_ref(), path)
    }

    #[test]
    fn builtin_table_passes_validation() {
        let routes = RouteTable::builtin();
        RouteTable::new(
            routes.policies().to_vec(),
            routes.public_paths().clone(),
            routes.login_path(),
        )
        .unwrap();
    }

    #[test]
    fn client_is_denied_finance_with_allowed_roles() {
        assert_eq!(
            evaluate(Some(Role::Client), "/finance"),
            RouteDecision::Deny {
                reason: DenyReason::RoleNotPermitted,
                allowed_roles: Some(BTreeSet::from([Role::Manager, Role::Owner])),
            }
        );
    }

    #[test]
    fn longest_prefix_wins() {
        let routes = RouteTable::builtin();
        assert_eq!(
            routes.matching("/finance/payments/42").unwrap().path_prefix,
            "/finance/payments"
        );
        assert_eq!(routes.matching("/finance/invoices").unwrap().path_prefix, "/finance");
        // Manager may view finance but lacks the payment approval feature.
        assert_eq!(
            evaluate(Some(Role::Manager), "/finance/payments/42"),
            RouteDecision::Deny {
                reason: DenyReason::FeatureNotEnabled,
                allowed_roles: None,
            }
        );
        assert!(evaluate(Some(Role::Owner), "/finance/payments/42").is_allowed());
    }

    #[test]
    fn precedence_does_not_depend_on_table_order() {
        let policies = vec![
            RoutePolicy::new("/a/b").roles([Role::Owner]),
            RoutePolicy::new("/a").roles([Role::Cleaner]),
        ];
        let reversed: Vec<_> = policies.iter().rev().cloned().collect();
        for policies in [policies, reversed] {
            let table = RouteTable::new(policies, PublicPaths::default(), "/login").unwrap();
            assert_eq!(table.matching("/a/b/c").unwrap().path_prefix, "/a/b");
        }
    }

    #[test]
    fn permission_gate_applies_after_roles() {
        assert_eq!(
            evaluate(Some(Role::Cleaner), "/reports"),
            RouteDecision::Deny {
                reason: DenyReason::PermissionMissing,
                allowed_roles: None,
            }
        );
        assert!(evaluate(Some(Role::Supervisor), "/reports").is_allowed());
    }

    #[test]
    fn redirect_replaces_deny() {
        assert_eq!(
            evaluate(Some(Role::Cleaner), "/tasks/new"),
            RouteDecision::Redirect {
                target: "/tasks".into()
            }
        );
        assert_eq!(
            evaluate(Some(Role::Owner), "/client"),
            RouteDecision::Redirect {
                target: "/dashboard".into()
            }
        );
    }

    #[test]
    fn unmatched_routes_are_public() {
        assert!(evaluate(Some(Role::Cleaner), "/help").is_allowed());
    }

    #[test]
    fn unauthenticated_callers_are_sent_to_login() {
        assert_eq!(
            evaluate(None, "/dashboard"),
            RouteDecision::Redirect {
                target: DEFAULT_LOGIN_PATH.into()
            }
        );
        assert!(evaluate(None, "/login").is_allowed());
        assert!(evaluate(None, "/public/brochure").is_allowed());
        assert!(!evaluate(None, "/publicity").is_allowed());
        assert!(!evaluate(None, "/help").is_allowed());
    }

    #[test]
    fn duplicate_and_relative_prefixes_are_rejected() {
        let duplicate = RouteTable::new(
            vec![RoutePolicy::new("/x"), RoutePolicy::new("/x").roles([Role::Owner])],
            PublicPaths::default(),
            "/login",
        );
        assert!(matches!(duplicate, Err(PolicyError::DuplicateRoutePrefix(p)) if p == "/x"));

        let relative =
            RouteTable::new(vec![RoutePolicy::new("x")], PublicPaths::default(), "/login");
        assert!(matches!(relative, Err(PolicyError::InvalidRoutePrefix(_))));
    }

    #[test]
    fn decisions_serialize_with_outcome_tag() {
        let json = serde_json::to_value(RouteDecision::Redirect {
            target: "/login".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "redirect", "target": "/login"}));
    }
}
