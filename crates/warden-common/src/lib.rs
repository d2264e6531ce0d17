//! ---
//! warden_section: "01-core-functionality"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Shared configuration and tracing primitives."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Shared primitives for the Warden workspace: configuration loading and
//! tracing initialisation consumed by the binaries.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, AuditConfig, LoadedAppConfig, LoggingConfig, PolicyConfig, SettingsConfig,
};
pub use logging::{init_tracing, LogFormat, LoggingGuard, DEFAULT_DIRECTIVES};
