//! ---
//! warden_section: "05-external-interfaces"
//! warden_subsection: "binary"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Administrative CLI for policy inspection and settings governance."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use warden_common::{init_tracing, AppConfig, LoggingGuard};
use warden_security::AccessPolicy;

mod policy;
mod settings;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Warden authorization and settings governance utility",
    long_about = None
)]
struct Cli {
    /// Configuration file (overrides the default search path; `WARDEN_CONFIG` wins over both).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Access policy document (overrides `[policy] path`).
    #[arg(long, global = true, value_name = "FILE")]
    policy: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Answer a single permission question.
    Check(policy::CheckArgs),
    /// Evaluate route access for a path.
    Route(policy::RouteArgs),
    /// Show features, navigation and capability level for a role.
    Access(policy::AccessArgs),
    /// Read and manage governed settings.
    Settings(settings::SettingsArgs),
}

/// Everything a subcommand needs, resolved once from configuration.
pub struct Context {
    pub config: AppConfig,
    pub policy: AccessPolicy,
    _logging: LoggingGuard,
}

fn load_context(cli: &Cli) -> Result<Context> {
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("warden.toml"));
    candidates.push(PathBuf::from("configs/warden.toml"));
    let loaded = AppConfig::load_with_source(&candidates)?;

    let logging = match &loaded.source {
        Some(_) => init_tracing("wardenctl", &loaded.config.logging)?,
        None => {
            warden_logging::init();
            LoggingGuard::default()
        }
    };
    if let Some(source) = &loaded.source {
        tracing::debug!(config_path = %source.display(), "configuration loaded");
    }

    let policy_path = cli.policy.as_deref().or(loaded.config.policy.path.as_deref());
    let policy = AccessPolicy::load_or_builtin(policy_path)?;
    Ok(Context {
        config: loaded.config,
        policy,
        _logging: logging,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = load_context(&cli)?;
    match cli.command {
        Commands::Check(args) => policy::check(&context, args),
        Commands::Route(args) => policy::route(&context, args),
        Commands::Access(args) => policy::access(&context, args),
        Commands::Settings(args) => settings::run(&context, args),
    }
}
