use anyhow::Result;
use clap::{Args, Subcommand};
use coursegate_policy_center::PolicyTables;
use serde_json::json;

use super::runtime::load_policy_tables;
use crate::config::Config;

#[derive(Args, Clone, Debug)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

#[derive(Subcommand, Clone, Debug)]
pub enum PolicyCommand {
    /// Print the effective tables after every overlay
    Show(PolicyShowArgs),
}

#[derive(Args, Clone, Debug)]
pub struct PolicyShowArgs {
    /// Output JSON instead of human summary
    #[arg(long)]
    pub json: bool,
}

pub async fn cmd_policy(args: PolicyArgs, config: &Config) -> Result<()> {
    match args.command {
        PolicyCommand::Show(show_args) => {
            let tables = load_policy_tables(config)?;
            if show_args.json {
                let payload = json!({
                    "policy": &tables,
                    "sources": &config.policy_paths,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print_summary(&tables);
            }
        }
    }
    Ok(())
}

fn print_summary(tables: &PolicyTables) {
    println!("Policy Revision: {}", tables.rev);
    println!();
    println!("Resource → roles");
    for (resource, roles) in &tables.resource_roles {
        let roles: Vec<&str> = roles.iter().map(|role| role.as_str()).collect();
        println!("  {resource:<18} {}", roles.join(", "));
    }
    println!("Role → permissions");
    for (role, permissions) in &tables.role_permissions {
        let permissions: Vec<&str> = permissions.iter().map(String::as_str).collect();
        println!("  {:<18} {}", role.as_str(), permissions.join(", "));
    }
    println!("Action → permission");
    for (action, permission) in &tables.action_permissions {
        println!("  {action:<18} {permission}");
    }
    println!(
        "Capacity → default={}, unresolved_course={:?}",
        tables.capacity.default_limit, tables.capacity.unresolved_course
    );
    for (modality, limit) in &tables.capacity.limits {
        println!("  {modality:<18} {limit}");
    }
    let overridden: Vec<_> = tables
        .provenance
        .values()
        .filter(|entry| entry.source != coursegate_policy_center::PolicySource::Builtin)
        .collect();
    if !overridden.is_empty() {
        println!("Overrides");
        for entry in overridden {
            println!("  {:<30} {:?}", entry.path, entry.source);
        }
    }
}
