//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Access policies, route gating, and cryptographic utilities."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::categories::{CategoryAccessTable, SettingCategory};
use crate::features::{FeatureTable, MenuGate, MenuRestriction, NavigationTable};
use crate::metrics::SecurityMetrics;
use crate::model::{Action, CapabilityLevel, Module, Principal, Role};
use crate::rbac::{Permission, PermissionMatrix, PermissionSet};
use crate::routes::{PublicPaths, RouteDecision, RouteEvaluator, RoutePolicy, RouteTable};

/// Errors raised while assembling policy tables.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A permission set lists the same module twice.
    #[error("module `{0}` appears more than once in a permission set")]
    DuplicateModule(Module),
    /// The matrix lists the same role twice.
    #[error("role `{0}` appears more than once in the permission matrix")]
    DuplicateRole(Role),
    /// Two route policies share a prefix.
    #[error("route prefix `{0}` is declared more than once")]
    DuplicateRoutePrefix(String),
    /// A route prefix or login path is not absolute.
    #[error("route path `{0}` must start with `/`")]
    InvalidRoutePrefix(String),
    /// A route requires a feature the feature table does not declare.
    #[error("route `{route}` requires undeclared feature `{feature}`")]
    UnknownFeature { route: String, feature: String },
    /// A `module:action` string could not be parsed.
    #[error("invalid permission `{0}`; expected `module:action`")]
    InvalidPermission(String),
    /// The policy document is not valid TOML or does not match the schema.
    #[error("failed to parse policy document: {0}")]
    Parse(#[from] toml::de::Error),
}

fn default_login_path() -> String {
    crate::routes::DEFAULT_LOGIN_PATH.to_owned()
}

/// Serialisable form of an [`AccessPolicy`], as stored in `policy.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyDocument {
    #[serde(default)]
    pub public_paths: Vec<String>,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default)]
    pub permissions: IndexMap<Role, IndexMap<Module, BTreeSet<Action>>>,
    #[serde(default)]
    pub features: BTreeMap<String, BTreeSet<Role>>,
    #[serde(default)]
    pub navigation: IndexMap<Role, Vec<String>>,
    #[serde(default)]
    pub categories: IndexMap<SettingCategory, BTreeSet<Role>>,
    #[serde(default)]
    pub routes: Vec<RoutePolicy>,
}

impl Default for PolicyDocument {
    fn default() -> Self {
        Self {
            permissions: IndexMap::new(),
            features: BTreeMap::new(),
            navigation: IndexMap::new(),
            routes: Vec::new(),
            public_paths: Vec::new(),
            login_path: default_login_path(),
            categories: IndexMap::new(),
        }
    }
}

/// The static tables every access decision is made against. Built once at
/// startup and shared read-only.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    matrix: PermissionMatrix,
    features: FeatureTable,
    navigation: NavigationTable,
    routes: RouteTable,
    categories: CategoryAccessTable,
    metrics: Option<SecurityMetrics>,
}

impl AccessPolicy {
    pub fn new(
        matrix: PermissionMatrix,
        features: FeatureTable,
        navigation: NavigationTable,
        routes: RouteTable,
        categories: CategoryAccessTable,
    ) -> Self {
        Self {
            matrix,
            features,
            navigation,
            routes,
            categories,
            metrics: None,
        }
    }

    /// Count permission denials and route outcomes on `metrics`.
    pub fn with_metrics(mut self, metrics: SecurityMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Policy shipped with the product.
    pub fn builtin() -> Self {
        Self::new(
            PermissionMatrix::builtin(),
            FeatureTable::builtin(),
            NavigationTable::builtin(),
            RouteTable::builtin(),
            CategoryAccessTable::builtin(),
        )
    }

    /// Build and validate a policy from its document form.
    pub fn from_document(document: PolicyDocument) -> Result<Self, PolicyError> {
        let mut rows = Vec::with_capacity(document.permissions.len());
        for (role, modules) in document.permissions {
            let permissions = modules
                .into_iter()
                .map(|(module, actions)| Permission::new(module, actions))
                .collect();
            rows.push((role, PermissionSet::new(permissions)?));
        }
        let matrix = PermissionMatrix::new(rows)?;
        let features = FeatureTable::new(document.features);
        for route in &document.routes {
            if let Some(feature) = &route.required_feature {
                if !features.contains(feature) {
                    return Err(PolicyError::UnknownFeature {
                        route: route.path_prefix.clone(),
                        feature: feature.clone(),
                    });
                }
            }
        }
        let routes = RouteTable::new(
            document.routes,
            PublicPaths::new(document.public_paths),
            document.login_path,
        )?;
        Ok(Self::new(
            matrix,
            features,
            NavigationTable::new(document.navigation),
            routes,
            CategoryAccessTable::new(document.categories),
        ))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, PolicyError> {
        let document: PolicyDocument = toml::from_str(raw)?;
        Self::from_document(document)
    }

    /// Load a policy document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(policy_path = %path.display(), "loading access policy");
        let raw = fs::read_to_string(path)
            .with_context(|| format!("unable to read policy file {}", path.display()))?;
        let policy = Self::from_toml_str(&raw)
            .with_context(|| format!("invalid policy file {}", path.display()))?;
        info!(
            policy_path = %path.display(),
            routes = policy.routes.policies().len(),
            features = policy.features.grants().len(),
            "access policy loaded"
        );
        Ok(policy)
    }

    /// Load from `path` when given, otherwise fall back to [`Self::builtin`].
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                debug!("no policy file configured; using built-in policy");
                Ok(Self::builtin())
            }
        }
    }

    /// Document form of this policy, suitable for writing to `policy.toml`.
    pub fn to_document(&self) -> PolicyDocument {
        use strum::IntoEnumIterator;

        let permissions = Role::iter()
            .filter_map(|role| {
                self.matrix.permissions(role).map(|set| {
                    let modules = set
                        .iter()
                        .map(|permission| (permission.module, permission.actions.clone()))
                        .collect();
                    (role, modules)
                })
            })
            .collect();
        let navigation = Role::iter()
            .filter_map(|role| {
                self.navigation
                    .entries()
                    .get(&role)
                    .map(|items| (role, items.clone()))
            })
            .collect();
        let categories = SettingCategory::iter()
            .filter_map(|category| {
                self.categories
                    .grants()
                    .get(&category)
                    .map(|roles| (category, roles.clone()))
            })
            .collect();

        PolicyDocument {
            permissions,
            features: self.features.grants().clone(),
            navigation,
            routes: self.routes.policies().to_vec(),
            public_paths: self.routes.public_paths().entries().to_vec(),
            login_path: self.routes.login_path().to_owned(),
            categories,
        }
    }

    pub fn matrix(&self) -> &PermissionMatrix {
        &self.matrix
    }

    pub fn features(&self) -> &FeatureTable {
        &self.features
    }

    pub fn navigation(&self) -> &NavigationTable {
        &self.navigation
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn categories(&self) -> &CategoryAccessTable {
        &self.categories
    }

    pub fn has_permission(&self, role: Role, module: Module, action: Action) -> bool {
        let granted = self.matrix.has_permission(role, module, action);
        if let Some(metrics) = &self.metrics {
            metrics.record_permission_check(granted);
        }
        granted
    }

    pub fn capability_level(&self, role: Role) -> CapabilityLevel {
        role.capability_level()
    }

    pub fn can_access_feature(&self, role: Role, feature: &str) -> bool {
        self.features.allows(role, feature)
    }

    pub fn accessible_navigation(&self, role: Role) -> &[String] {
        self.navigation.accessible(role)
    }

    pub fn menu_gate(&self) -> MenuGate<'_> {
        MenuGate::new(&self.matrix, &self.features)
    }

    pub fn filter_menu<'i, T, F>(&self, role: Role, items: &'i [T], restriction: F) -> Vec<&'i T>
    where
        F: Fn(&T) -> &MenuRestriction,
    {
        self.menu_gate().filter(role, items, restriction)
    }

    pub fn route_evaluator(&self) -> RouteEvaluator<'_> {
        RouteEvaluator::new(&self.routes, &self.matrix, &self.features)
    }

    pub fn evaluate_route(&self, principal: Option<&Principal>, path: &str) -> RouteDecision {
        let decision = self.route_evaluator().evaluate(principal, path);
        if let Some(metrics) = &self.metrics {
            metrics.record_route_decision(&decision);
        }
        decision
    }

    pub fn has_category_access(&self, role: Role, category: SettingCategory) -> bool {
        self.categories.allows(role, category)
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::DenyReason;

    const SAMPLE: &str = r#"
        public_paths = ["/login"]

        [permissions.cleaner]
        tasks = ["view", "upload_photo"]

        [permissions.manager]
        tasks = ["view", "create"]
        finance = ["view_finance"]

        [features]
        photo_upload = ["cleaner"]

        [navigation]
        cleaner = ["tasks"]

        [categories]
        finance = ["manager"]

        [[routes]]
        path = "/finance"
        roles = ["manager"]
        permission = "finance:view_finance"

        [[routes]]
        path = "/tasks/new"
        permission = "tasks:create"
        redirect = "/tasks"
    "#;

    #[test]
    fn loads_policy_from_toml() {
        let policy = AccessPolicy::from_toml_str(SAMPLE).unwrap();
        assert!(policy.has_permission(Role::Cleaner, Module::Tasks, Action::UploadPhoto));
        assert!(!policy.has_permission(Role::Owner, Module::Tasks, Action::View));
        assert!(policy.can_access_feature(Role::Cleaner, "photo_upload"));
        assert_eq!(policy.accessible_navigation(Role::Cleaner), ["tasks"]);
        assert!(policy.has_category_access(Role::Manager, SettingCategory::Finance));
        assert!(!policy.has_category_access(Role::Manager, SettingCategory::General));
        assert_eq!(policy.routes().login_path(), "/login");

        let cleaner = Principal::new(Role::Cleaner);
        assert_eq!(
            policy.evaluate_route(Some(&cleaner), "/finance"),
            RouteDecision::Deny {
                reason: DenyReason::RoleNotPermitted,
                allowed_roles: Some(BTreeSet::from([Role::Manager])),
            }
        );
        assert_eq!(
            policy.evaluate_route(Some(&cleaner), "/tasks/new"),
            RouteDecision::Redirect {
                target: "/tasks".into()
            }
        );
    }

    #[test]
    fn rejects_duplicate_route_prefixes() {
        let raw = r#"
            [[routes]]
            path = "/a"
            [[routes]]
            path = "/a"
        "#;
        assert!(matches!(
            AccessPolicy::from_toml_str(raw),
            Err(PolicyError::DuplicateRoutePrefix(_))
        ));
    }

    #[test]
    fn rejects_malformed_permissions() {
        let raw = r#"
            [[routes]]
            path = "/a"
            permission = "tasks"
        "#;
        assert!(matches!(
            AccessPolicy::from_toml_str(raw),
            Err(PolicyError::Parse(_))
        ));
    }

    #[test]
    fn rejects_routes_gated_on_undeclared_features() {
        let raw = r#"
            [features]
            reports = ["manager"]

            [[routes]]
            path = "/reports"
            feature = "report"
        "#;
        assert!(matches!(
            AccessPolicy::from_toml_str(raw),
            Err(PolicyError::UnknownFeature { feature, .. }) if feature == "report"
        ));
    }

    #[test]
    fn attached_metrics_count_denials() {
        let metrics = SecurityMetrics::detached().unwrap();
        let policy = AccessPolicy::builtin().with_metrics(metrics.clone());
        assert!(!policy.has_permission(Role::Cleaner, Module::Finance, Action::ViewFinance));
        assert!(policy.has_permission(Role::Owner, Module::Finance, Action::ViewFinance));
        let cleaner = Principal::new(Role::Cleaner);
        assert!(!policy.evaluate_route(Some(&cleaner), "/finance").is_allowed());
        assert_eq!(metrics.permission_denials(), 1);
        assert_eq!(metrics.route_denials(), 1);
    }

    #[test]
    fn builtin_policy_survives_document_round_trip() {
        let builtin = AccessPolicy::builtin();
        let rendered = toml::to_string(&builtin.to_document()).unwrap();
        let reloaded = AccessPolicy::from_toml_str(&rendered).unwrap();
        assert_eq!(reloaded.to_document(), builtin.to_document());
    }

    #[test]
    fn load_reads_policy_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.toml");
        fs::write(&path, SAMPLE).unwrap();
        let policy = AccessPolicy::load_or_builtin(Some(&path)).unwrap();
        assert!(policy.has_permission(Role::Manager, Module::Finance, Action::ViewFinance));
        assert!(AccessPolicy::load(dir.path().join("missing.toml")).is_err());
    }
}
