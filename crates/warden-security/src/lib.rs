//! ---
//! warden_section: "06-security-access-control"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Access policies, route gating, and cryptographic utilities."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Role-based access control for Warden.
//!
//! Every decision in this crate is a pure lookup against immutable tables held
//! by [`AccessPolicy`]. Nothing here performs I/O except policy loading and the
//! [`AuditLog`].

pub mod audit;
pub mod categories;
pub mod crypto;
pub mod features;
pub mod metrics;
pub mod model;
pub mod policy;
pub mod rbac;
pub mod routes;

pub use audit::{AuditEntry, AuditEvent, AuditLog};
pub use categories::{CategoryAccessTable, SettingCategory};
pub use crypto::{CryptoError, KeyMaterial, SettingsCipher};
pub use features::{FeatureTable, MenuGate, MenuRestriction, NavigationTable};
pub use metrics::SecurityMetrics;
pub use model::{Action, CapabilityLevel, Module, Principal, Role};
pub use policy::{AccessPolicy, PolicyDocument, PolicyError};
pub use rbac::{Permission, PermissionMatrix, PermissionSet, RequiredPermission};
pub use routes::{DenyReason, PublicPaths, RouteDecision, RouteEvaluator, RoutePolicy, RouteTable};
