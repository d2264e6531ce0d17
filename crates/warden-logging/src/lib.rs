//! ---
//! warden_section: "03-persistence-logging"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Structured access and system event logging."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Structured logging helpers shared by the Warden crates.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

#[doc(hidden)]
pub use tracing;

/// Target used for every access decision event.
pub const ACCESS_TARGET: &str = "warden::access";

/// Initialize a baseline tracing subscriber suitable for development and CLI use.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Role of the principal involved in the event.
    pub role: Option<&'a str>,
    /// Settings category touched by the event.
    pub category: Option<&'a str>,
    /// Settings key touched by the event.
    pub key: Option<&'a str>,
    /// Request path evaluated by the route gate.
    pub path: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a role name.
    pub fn with_role(mut self, role: &'a str) -> Self {
        self.role = Some(role);
        self
    }

    /// Attach a settings category.
    pub fn with_category(mut self, category: &'a str) -> Self {
        self.category = Some(category);
        self
    }

    /// Attach a settings key.
    pub fn with_key(mut self, key: &'a str) -> Self {
        self.key = Some(key);
        self
    }

    /// Attach a request path.
    pub fn with_path(mut self, path: &'a str) -> Self {
        self.path = Some(path);
        self
    }
}

/// Result of an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    /// The principal was allowed through.
    Granted,
    /// The principal was refused.
    Denied,
}

impl AccessOutcome {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessOutcome::Granted => "granted",
            AccessOutcome::Denied => "denied",
        }
    }
}

impl From<bool> for AccessOutcome {
    fn from(granted: bool) -> Self {
        if granted {
            AccessOutcome::Granted
        } else {
            AccessOutcome::Denied
        }
    }
}

/// Emit an access decision. Grants log at DEBUG, denials at INFO, both under
/// [`ACCESS_TARGET`]. Denials are normal outcomes and never logged as errors.
pub fn log_access_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: AccessOutcome,
) {
    let default = LogContext::default();
    let ctx = context.unwrap_or(&default);
    let role = ctx.role.unwrap_or("");
    let category = ctx.category.unwrap_or("");
    let key = ctx.key.unwrap_or("");
    let path = ctx.path.unwrap_or("");
    match outcome {
        AccessOutcome::Granted => tracing::event!(
            target: "warden::access",
            Level::DEBUG,
            event,
            outcome = outcome.as_str(),
            role,
            category,
            key,
            path,
            message = %message
        ),
        AccessOutcome::Denied => tracing::event!(
            target: "warden::access",
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            role,
            category,
            key,
            path,
            message = %message
        ),
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation failed or was aborted.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized system event with a success/fault outcome.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let default = LogContext::default();
    let ctx = context.unwrap_or(&default);
    let role = ctx.role.unwrap_or("");
    let category = ctx.category.unwrap_or("");
    let key = ctx.key.unwrap_or("");
    match outcome {
        SystemEventOutcome::Success => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            role,
            category,
            key,
            message = %message
        ),
        SystemEventOutcome::Fault => tracing::event!(
            Level::ERROR,
            event,
            outcome = outcome.as_str(),
            role,
            category,
            key,
            message = %message
        ),
    }
}
