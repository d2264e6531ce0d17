//! ---
//! warden_section: "15-testing-qa-runbook"
//! warden_subsection: "integration-tests"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Integration and validation tests for the Warden governance stack."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use tempfile::tempdir;
use warden_common::AppConfig;
use warden_security::{
    AccessPolicy, Action, AuditLog, DenyReason, KeyMaterial, MenuRestriction, Module, Principal,
    RequiredPermission, Role, RouteDecision, SecurityMetrics, SettingsCipher,
};
use warden_settings::{
    BatchEntry, FileBackend, PutOptions, SettingType, SettingsError, SettingsStore,
};

#[test]
fn route_gate_uses_longest_prefix_and_records_outcomes() {
    let registry = Arc::new(prometheus::Registry::new());
    let metrics = SecurityMetrics::new(registry.clone()).unwrap();
    let policy = AccessPolicy::builtin().with_metrics(metrics.clone());

    let manager = Principal::new(Role::Manager);
    let owner = Principal::new(Role::Owner);
    let client = Principal::new(Role::Client);

    // `/finance` alone would admit a manager; `/finance/payments` also needs
    // the owner-only payment approval feature.
    let decision = policy.evaluate_route(Some(&manager), "/finance/payments/42");
    assert_eq!(
        decision,
        RouteDecision::Deny {
            reason: DenyReason::FeatureNotEnabled,
            allowed_roles: None,
        }
    );
    assert!(policy
        .evaluate_route(Some(&manager), "/finance/reports")
        .is_allowed());
    assert!(policy
        .evaluate_route(Some(&owner), "/finance/payments/42")
        .is_allowed());

    let decision = policy.evaluate_route(Some(&client), "/finance");
    assert_eq!(
        decision,
        RouteDecision::Deny {
            reason: DenyReason::RoleNotPermitted,
            allowed_roles: Some(BTreeSet::from([Role::Manager, Role::Owner])),
        }
    );

    let decision = policy.evaluate_route(None, "/settings");
    assert_eq!(
        decision,
        RouteDecision::Redirect {
            target: "/login".into()
        }
    );
    assert!(policy.evaluate_route(None, "/public/brochure").is_allowed());
    assert!(policy.evaluate_route(Some(&client), "/unlisted").is_allowed());

    assert!(!policy.has_permission(Role::Client, Module::Finance, Action::View));
    assert_eq!(metrics.route_denials(), 2);
    assert_eq!(metrics.route_redirects(), 1);
    assert_eq!(metrics.permission_denials(), 1);
}

#[test]
fn alternate_policy_documents_drive_every_gate() {
    let mut document = AccessPolicy::builtin().to_document();
    document
        .permissions
        .get_mut(&Role::Cleaner)
        .unwrap()
        .insert(Module::Reports, BTreeSet::from([Action::View]));
    document
        .features
        .insert("beta_dashboard".into(), BTreeSet::from([Role::Cleaner]));
    let policy = AccessPolicy::from_document(document).unwrap();

    assert!(policy.has_permission(Role::Cleaner, Module::Reports, Action::View));
    assert!(policy.can_access_feature(Role::Cleaner, "beta_dashboard"));
    assert!(!AccessPolicy::builtin().has_permission(
        Role::Cleaner,
        Module::Reports,
        Action::View
    ));

    let menu = [
        (
            "reports",
            MenuRestriction::Permission(RequiredPermission::new(Module::Reports, Action::View)),
        ),
        ("beta", MenuRestriction::Feature("beta_dashboard".into())),
        ("owners", MenuRestriction::Roles(BTreeSet::from([Role::Owner]))),
        ("help", MenuRestriction::None),
    ];
    let visible: Vec<&str> = policy
        .filter_menu(Role::Cleaner, &menu, |item| &item.1)
        .into_iter()
        .map(|item| item.0)
        .collect();
    assert_eq!(visible, ["reports", "beta", "help"]);
}

#[test]
fn settings_governance_end_to_end() {
    let dir = tempdir().unwrap();
    let config = AppConfig::from_str(&format!(
        r#"
        [settings]
        store_path = "{root}/state/settings.json"

        [audit]
        path = "{root}/state/audit.log"
        "#,
        root = dir.path().display()
    ))
    .unwrap();

    let key = KeyMaterial::generate();
    let policy = AccessPolicy::builtin();
    let registry = Arc::new(prometheus::Registry::new());
    let metrics = SecurityMetrics::new(registry).unwrap();
    let open = || {
        SettingsStore::new(
            FileBackend::open(&config.settings.store_path).unwrap(),
            policy.categories().clone(),
        )
        .with_cipher(SettingsCipher::new(&key).unwrap())
        .with_audit(AuditLog::open(config.audit_path().unwrap()).unwrap())
        .with_metrics(metrics.clone())
    };

    let store = open();
    let seeded = store.initialize_defaults().unwrap();
    assert!(seeded > 0);

    let number = PutOptions::typed(SettingType::Number);
    let written = store
        .put("finance", "tax_rate", "0.07", Role::Manager, number)
        .unwrap();
    assert_eq!(written.value, "0.07");
    assert!(matches!(
        store.put("finance", "tax_rate", "0.07", Role::Cleaner, number),
        Err(SettingsError::AccessDenied { .. })
    ));

    let outcome = store.batch_put(
        "integrations",
        vec![
            BatchEntry::new(
                "payment_api_key",
                "sk_live_42",
                PutOptions::typed(SettingType::Encrypted),
            ),
            BatchEntry::new("retry_policy", "{oops", PutOptions::typed(SettingType::Json)),
            BatchEntry::new(
                "webhook_url",
                "https://hooks.invalid/warden",
                PutOptions::default(),
            ),
        ],
        Role::Manager,
    );
    assert_eq!(outcome.updated.len(), 2);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].starts_with("retry_policy"));
    drop(store);

    // State, ciphertext and audit chain survive a restart.
    let raw = std::fs::read_to_string(&config.settings.store_path).unwrap();
    assert!(!raw.contains("sk_live_42"));

    let store = open();
    assert_eq!(store.initialize_defaults().unwrap(), 0);
    assert_eq!(
        store
            .get("integrations", "payment_api_key", Role::Owner)
            .unwrap()
            .unwrap()
            .value,
        "sk_live_42"
    );
    assert_eq!(
        store.get_number("finance", "tax_rate", Role::Owner).unwrap(),
        Some(0.07)
    );

    let export = store.export(Role::Owner).unwrap();
    assert!(export
        .settings
        .iter()
        .any(|setting| setting.key == "payment_api_key" && setting.value == "sk_live_42"));
    assert!(matches!(
        store.import("[]", Role::Manager),
        Err(SettingsError::AccessDenied { .. })
    ));

    let audit = AuditLog::open(config.audit_path().unwrap()).unwrap();
    assert!(audit.verify().unwrap());
    assert!(!std::fs::read_to_string(audit.path()).unwrap().contains("sk_live_42"));

    assert_eq!(metrics.settings_access_denials(), 2);
    assert_eq!(metrics.settings_validation_failures(), 1);
}
