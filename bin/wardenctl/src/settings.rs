//! ---
//! warden_section: "05-external-interfaces"
//! warden_subsection: "binary"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Administrative CLI for policy inspection and settings governance."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context as _, Result};
use clap::{Args, Subcommand};
use warden_logging::{log_system_event, LogContext, SystemEventOutcome};
use warden_security::{AuditLog, KeyMaterial, Role, SettingsCipher};
use warden_settings::{FileBackend, PutOptions, SettingType, SettingsError, SettingsStore};

use crate::Context;

#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// Role the operation is performed as.
    #[arg(long)]
    role: Role,
    #[command(subcommand)]
    command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Seed missing defaults (highest role only).
    Init,
    /// Print one setting.
    Get { category: String, key: String },
    /// Print every setting in a category.
    List { category: String },
    /// Create or replace a setting.
    Put {
        category: String,
        key: String,
        value: String,
        #[arg(long = "type", default_value_t = SettingType::String)]
        setting_type: SettingType,
        #[arg(long)]
        encrypted: bool,
    },
    /// Remove a setting.
    Delete { category: String, key: String },
    /// Write all settings as plaintext JSON (highest role only).
    Export {
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Replay a JSON payload through the regular write path (highest role only).
    Import { file: PathBuf },
}

fn open_store(context: &Context) -> Result<SettingsStore> {
    let config = &context.config;
    let backend = FileBackend::open(&config.settings.store_path).with_context(|| {
        format!(
            "unable to open settings store {}",
            config.settings.store_path.display()
        )
    })?;
    let mut store = SettingsStore::new(backend, context.policy.categories().clone());

    let key_var = config.settings.key_env_var.as_str();
    if std::env::var_os(key_var).is_some() {
        let key = KeyMaterial::from_env(key_var)?;
        store = store.with_cipher(SettingsCipher::new(&key)?);
    } else {
        tracing::debug!(key_env_var = key_var, "no settings key in environment");
    }

    if let Some(path) = config.audit_path() {
        store = store.with_audit(AuditLog::open(path)?);
    }
    Ok(store)
}

fn require_highest(role: Role, operation: &str) -> Result<()> {
    if role == Role::highest() {
        return Ok(());
    }
    Err(anyhow!(
        "{operation} requires the `{}` role; `{role}` is not permitted",
        Role::highest()
    ))
}

pub fn run(context: &Context, args: SettingsArgs) -> Result<()> {
    let store = open_store(context)?;
    let role = args.role;
    let result = execute(&store, role, args.command);
    if let Err(err) = &result {
        // Denials and rejected values were already logged as access events.
        let expected = err
            .downcast_ref::<SettingsError>()
            .is_some_and(SettingsError::is_user_facing);
        if !expected {
            log_system_event(
                Some(&LogContext::new().with_role(role.as_ref())),
                "settings.command",
                &format!("{err:#}"),
                SystemEventOutcome::Fault,
            );
        }
    }
    result
}

fn execute(store: &SettingsStore, role: Role, command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Init => {
            require_highest(role, "settings init")?;
            let seeded = store.initialize_defaults()?;
            println!("seeded {seeded} settings");
        }
        SettingsCommand::Get { category, key } => match store.get(&category, &key, role)? {
            Some(setting) => println!("{}", serde_json::to_string_pretty(&setting)?),
            None => return Err(anyhow!("setting {category}/{key} not found")),
        },
        SettingsCommand::List { category } => {
            let settings = store.get_all(&category, role)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsCommand::Put {
            category,
            key,
            value,
            setting_type,
            encrypted,
        } => {
            let options = PutOptions {
                setting_type,
                encrypted,
            };
            let setting = store.put(&category, &key, &value, role, options)?;
            println!("{}", serde_json::to_string_pretty(&setting)?);
        }
        SettingsCommand::Delete { category, key } => {
            store.delete(&category, &key, role)?;
            println!("deleted {category}/{key}");
        }
        SettingsCommand::Export { output } => {
            let rendered = store.export(role)?.to_json_pretty()?;
            match output {
                Some(path) => {
                    fs::write(&path, rendered)
                        .with_context(|| format!("unable to write {}", path.display()))?;
                    log_system_event(
                        Some(&LogContext::new().with_role(role.as_ref())),
                        "settings.export",
                        &format!("settings exported to {}", path.display()),
                        SystemEventOutcome::Success,
                    );
                }
                None => println!("{rendered}"),
            }
        }
        SettingsCommand::Import { file } => {
            let payload = fs::read_to_string(&file)
                .with_context(|| format!("unable to read {}", file.display()))?;
            let imported = store.import(&payload, role)?;
            println!("imported {imported} settings");
        }
    }
    Ok(())
}
