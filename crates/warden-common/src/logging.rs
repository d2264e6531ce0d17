//! ---
//! warden_section: "01-core-functionality"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Shared configuration and tracing primitives."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::{filter_fn, EnvFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use warden_logging::ACCESS_TARGET;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "WARDEN_LOG";

/// Applied when neither `WARDEN_LOG` nor `RUST_LOG` is set. Access grants are
/// DEBUG events, so the access target is opened up to keep them on record.
pub const DEFAULT_DIRECTIVES: &str =
    "info,warden_security=debug,warden_settings=debug,warden::access=debug";

/// Service that installed the global subscriber.
static ACTIVE_SERVICE: OnceCell<String> = OnceCell::new();

/// Console log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Keeps the file writers flushing. Drop it only when the process is done
/// logging; buffered lines are written out on drop.
#[must_use = "dropping the guard stops the log file writers"]
#[derive(Debug, Default)]
pub struct LoggingGuard {
    workers: Vec<WorkerGuard>,
}

impl LoggingGuard {
    /// False when tracing had already been initialised and this call was a no-op.
    pub fn is_active(&self) -> bool {
        !self.workers.is_empty()
    }
}

/// First non-blank of `WARDEN_LOG`, `RUST_LOG`, otherwise [`DEFAULT_DIRECTIVES`].
fn filter_directives(warden_log: Option<String>, rust_log: Option<String>) -> String {
    [warden_log, rust_log]
        .into_iter()
        .flatten()
        .find(|directive| !directive.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_owned())
}

fn resolve_filter() -> EnvFilter {
    let directives = filter_directives(
        std::env::var(LOG_ENV).ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
    );
    EnvFilter::try_new(&directives).unwrap_or_else(|err| {
        eprintln!("invalid log directive `{directives}` ({err}); using defaults");
        EnvFilter::new(DEFAULT_DIRECTIVES)
    })
}

/// Initialize the tracing subscriber from configuration and environment.
///
/// Console output goes to stderr so command output on stdout stays clean. A
/// daily rolling JSON file `<prefix>-<service>.log` is written under
/// `config.directory`, plus `<prefix>-access.log` carrying only
/// `warden::access` events when `config.access_log` is set. Only the first
/// call installs a subscriber; later calls return an inactive guard.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    if let Some(active) = ACTIVE_SERVICE.get() {
        debug!(service = %service_name, active = %active, "tracing already initialised");
        return Ok(LoggingGuard::default());
    }

    std::fs::create_dir_all(&config.directory)?;
    let prefix = config.file_prefix.as_deref().unwrap_or("warden");
    let mut workers = Vec::with_capacity(2);

    let service_appender = daily(&config.directory, format!("{prefix}-{service_name}.log"));
    let (service_writer, service_guard) = tracing_appender::non_blocking(service_appender);
    workers.push(service_guard);
    let service_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(service_writer)
        .boxed();

    let access_layer = if config.access_log {
        let access_appender = daily(&config.directory, format!("{prefix}-access.log"));
        let (access_writer, access_guard) = tracing_appender::non_blocking(access_appender);
        workers.push(access_guard);
        Some(
            fmt::layer()
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .json()
                .with_writer(access_writer)
                .with_filter(filter_fn(|meta| meta.target() == ACCESS_TARGET))
                .boxed(),
        )
    } else {
        None
    };

    let console_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(std::io::stderr)
            .boxed(),
    };

    if tracing_subscriber::registry()
        .with(resolve_filter())
        .with(console_layer)
        .with(service_layer)
        .with(access_layer)
        .try_init()
        .is_err()
    {
        // Another subscriber (e.g. a test harness) owns the global slot.
        return Ok(LoggingGuard::default());
    }
    let _ = ACTIVE_SERVICE.set(service_name.to_owned());

    info!(
        service = %service_name,
        log_dir = %config.directory.display(),
        format = ?config.format,
        access_log = config.access_log,
        "tracing initialised"
    );
    Ok(LoggingGuard { workers })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_prefer_warden_log_then_rust_log() {
        assert_eq!(
            filter_directives(Some("warden_settings=trace".into()), Some("warn".into())),
            "warden_settings=trace"
        );
        assert_eq!(filter_directives(Some("  ".into()), Some("warn".into())), "warn");
        assert_eq!(filter_directives(None, None), DEFAULT_DIRECTIVES);
    }

    #[test]
    fn default_directives_parse() {
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVES).is_ok());
    }

    #[test]
    fn init_creates_log_directory_and_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            directory: dir.path().join("logs"),
            format: LogFormat::Pretty,
            file_prefix: Some("test".into()),
            access_log: true,
        };
        let _first = init_tracing("wardenctl", &config).unwrap();
        let second = init_tracing("wardenctl", &config).unwrap();
        assert!(!second.is_active());
        assert!(config.directory.is_dir());
    }

    #[test]
    fn log_format_uses_kebab_case() {
        let parsed: LoggingConfig = toml::from_str("format = \"structured-json\"").unwrap();
        assert_eq!(parsed.format, LogFormat::StructuredJson);
        assert!(parsed.access_log);
    }
}
