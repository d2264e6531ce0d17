//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Access policies, route gating, and cryptographic utilities."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use prometheus::{IntCounter, Registry};
use std::sync::Arc;

use crate::routes::RouteDecision;

/// Governance counters exported via Prometheus.
#[derive(Clone)]
pub struct SecurityMetrics {
    registry: Arc<Registry>,
    route_denials_total: IntCounter,
    route_redirects_total: IntCounter,
    permission_denials_total: IntCounter,
    settings_access_denials_total: IntCounter,
    settings_validation_failures_total: IntCounter,
    settings_decryption_failures_total: IntCounter,
}

impl SecurityMetrics {
    /// Register metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> anyhow::Result<Self> {
        let route_denials_total =
            IntCounter::new("route_denials_total", "Route evaluations that ended in a denial")?;
        let route_redirects_total = IntCounter::new(
            "route_redirects_total",
            "Route evaluations that ended in a redirect",
        )?;
        let permission_denials_total = IntCounter::new(
            "permission_denials_total",
            "Permission checks answered with false",
        )?;
        let settings_access_denials_total = IntCounter::new(
            "settings_access_denials_total",
            "Settings operations refused by the category gate",
        )?;
        let settings_validation_failures_total = IntCounter::new(
            "settings_validation_failures_total",
            "Settings writes rejected by value validation",
        )?;
        let settings_decryption_failures_total = IntCounter::new(
            "settings_decryption_failures_total",
            "Encrypted settings that could not be decrypted",
        )?;

        registry.register(Box::new(route_denials_total.clone()))?;
        registry.register(Box::new(route_redirects_total.clone()))?;
        registry.register(Box::new(permission_denials_total.clone()))?;
        registry.register(Box::new(settings_access_denials_total.clone()))?;
        registry.register(Box::new(settings_validation_failures_total.clone()))?;
        registry.register(Box::new(settings_decryption_failures_total.clone()))?;

        Ok(Self {
            registry,
            route_denials_total,
            route_redirects_total,
            permission_denials_total,
            settings_access_denials_total,
            settings_validation_failures_total,
            settings_decryption_failures_total,
        })
    }

    /// Counters on a private registry, for callers that do not export metrics.
    pub fn detached() -> anyhow::Result<Self> {
        Self::new(Arc::new(Registry::new()))
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn record_route_decision(&self, decision: &RouteDecision) {
        match decision {
            RouteDecision::Allow => {}
            RouteDecision::Deny { .. } => self.route_denials_total.inc(),
            RouteDecision::Redirect { .. } => self.route_redirects_total.inc(),
        }
    }

    /// Count a permission check; only denials are tracked.
    pub fn record_permission_check(&self, granted: bool) {
        if !granted {
            self.permission_denials_total.inc();
        }
    }

    pub fn inc_settings_access_denial(&self) {
        self.settings_access_denials_total.inc();
    }

    pub fn inc_settings_validation_failure(&self) {
        self.settings_validation_failures_total.inc();
    }

    pub fn inc_settings_decryption_failure(&self) {
        self.settings_decryption_failures_total.inc();
    }

    pub fn route_denials(&self) -> u64 {
        self.route_denials_total.get()
    }

    pub fn route_redirects(&self) -> u64 {
        self.route_redirects_total.get()
    }

    pub fn permission_denials(&self) -> u64 {
        self.permission_denials_total.get()
    }

    pub fn settings_access_denials(&self) -> u64 {
        self.settings_access_denials_total.get()
    }

    pub fn settings_validation_failures(&self) -> u64 {
        self.settings_validation_failures_total.get()
    }

    pub fn settings_decryption_failures(&self) -> u64 {
        self.settings_decryption_failures_total.get()
    }
}

impl std::fmt::Debug for SecurityMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityMetrics")
            .field("route_denials", &self.route_denials())
            .field("permission_denials", &self.permission_denials())
            .field("settings_access_denials", &self.settings_access_denials())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::DenyReason;

    #[test]
    fn metrics_increment() {
        let registry = Arc::new(Registry::new());
        let metrics = SecurityMetrics::new(registry.clone()).unwrap();
        metrics.record_route_decision(&RouteDecision::Allow);
        metrics.record_route_decision(&RouteDecision::Deny {
            reason: DenyReason::PermissionMissing,
            allowed_roles: None,
        });
        metrics.record_route_decision(&RouteDecision::Redirect {
            target: "/login".into(),
        });
        metrics.record_permission_check(true);
        metrics.record_permission_check(false);
        metrics.inc_settings_access_denial();
        metrics.inc_settings_validation_failure();
        metrics.inc_settings_decryption_failure();

        assert_eq!(metrics.route_denials(), 1);
        assert_eq!(metrics.route_redirects(), 1);
        assert_eq!(metrics.permission_denials(), 1);
        assert_eq!(metrics.settings_access_denials(), 1);
        assert_eq!(registry.gather().len(), 6);
    }

    #[test]
    fn registering_twice_on_one_registry_fails() {
        let registry = Arc::new(Registry::new());
        SecurityMetrics::new(registry.clone()).unwrap();
        assert!(SecurityMetrics::new(registry).is_err());
    }
}
