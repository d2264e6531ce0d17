//! ---
//! warden_section: "05-external-interfaces"
//! warden_subsection: "binary"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Administrative CLI for policy inspection and settings governance."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use warden_logging::{log_access_event, AccessOutcome, LogContext};
use warden_security::{Action, CapabilityLevel, Module, Principal, Role};

use crate::Context;

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[arg(long)]
    role: Role,
    #[arg(long)]
    module: Module,
    #[arg(long)]
    action: Action,
}

#[derive(Debug, Args)]
pub struct RouteArgs {
    /// Role of the caller; omit to evaluate as an unauthenticated request.
    #[arg(long)]
    role: Option<Role>,
    /// Request path, e.g. `/finance/payments/42`.
    path: String,
}

#[derive(Debug, Args)]
pub struct AccessArgs {
    #[arg(long)]
    role: Role,
}

pub fn check(context: &Context, args: CheckArgs) -> Result<()> {
    let granted = context
        .policy
        .has_permission(args.role, args.module, args.action);
    let target = format!("{}:{}", args.module, args.action);
    log_access_event(
        Some(&LogContext::new().with_role(args.role.as_ref()).with_key(&target)),
        "permission.check",
        "permission evaluated",
        AccessOutcome::from(granted),
    );
    println!("{}", if granted { "granted" } else { "denied" });
    Ok(())
}

pub fn route(context: &Context, args: RouteArgs) -> Result<()> {
    let principal = args.role.map(Principal::new);
    let decision = context.policy.evaluate_route(principal.as_ref(), &args.path);

    let role = args.role.map(|role| role.to_string()).unwrap_or_default();
    log_access_event(
        Some(&LogContext::new().with_role(&role).with_path(&args.path)),
        "route.evaluate",
        "route evaluated",
        AccessOutcome::from(decision.is_allowed()),
    );
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

#[derive(Debug, Serialize)]
struct AccessReport<'a> {
    role: Role,
    capability_level: CapabilityLevel,
    features: Vec<&'a str>,
    navigation: &'a [String],
}

pub fn access(context: &Context, args: AccessArgs) -> Result<()> {
    let report = AccessReport {
        role: args.role,
        capability_level: context.policy.capability_level(args.role),
        features: context.policy.features().features_for(args.role),
        navigation: context.policy.accessible_navigation(args.role),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
