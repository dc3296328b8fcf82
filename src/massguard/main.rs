use clap::Parser;
use colored::*;
use massguard::api::MassGuard;
use massguard::attributes::{AttrValue, WhitelistSpec};
use massguard::config::PolicyFile;
use massguard::error::{GuardError, Result};
use massguard::filter::Filtered;
use massguard::policy::FieldsetSelector;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod args;
use args::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {}", "Error:".red(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Filter {
            policy,
            entity,
            fieldset,
            literal,
            payload,
        } => handle_filter(&policy, &entity, fieldset, literal, payload),
        Commands::Fieldsets { policy, entity } => handle_fieldsets(&policy, entity),
        Commands::Check { policy } => handle_check(&policy),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn handle_filter(
    policy_path: &Path,
    entity: &str,
    fieldset: Option<String>,
    literal: Option<String>,
    payload_path: Option<PathBuf>,
) -> Result<()> {
    let policy = PolicyFile::load(policy_path)?;
    let guard = MassGuard::from_policy_file(&policy)?;

    let selector = match (fieldset, literal) {
        (Some(name), _) => FieldsetSelector::Named(name),
        (None, Some(literal)) => {
            let value: AttrValue = serde_json::from_str(&literal)?;
            FieldsetSelector::Literal(WhitelistSpec::from_value(&value)?)
        }
        (None, None) => {
            return Err(GuardError::InvalidSpec(
                "either --fieldset or --literal is required".into(),
            ))
        }
    };

    let content = match payload_path {
        Some(path) => fs::read_to_string(path)?,
        None => io::read_to_string(io::stdin())?,
    };
    let payload: AttrValue = serde_json::from_str(&content)?;

    let filtered = guard.filter_for(entity, selector, &payload)?;
    print_rejections(&filtered);
    println!("{}", serde_json::to_string_pretty(&filtered.into_value())?);
    Ok(())
}

fn handle_fieldsets(policy_path: &Path, entity: Option<String>) -> Result<()> {
    let policy = PolicyFile::load(policy_path)?;
    let registry = policy.build_registry()?;

    match entity {
        Some(entity) => {
            if !policy.entities.contains_key(&entity) {
                return Err(GuardError::UnknownEntity(entity));
            }
            for name in registry.fieldsets(&entity) {
                println!("{}", name);
            }
        }
        None => {
            for entity in policy.entities.keys() {
                let names = registry.fieldsets(entity);
                if names.is_empty() {
                    println!("{} {}", entity.bold(), "(none)".dimmed());
                } else {
                    println!("{} {}", entity.bold(), names.join(", "));
                }
            }
        }
    }
    Ok(())
}

fn handle_check(policy_path: &Path) -> Result<()> {
    let policy = PolicyFile::load(policy_path)?;
    policy.validate()?;
    let registry = policy.build_registry()?;

    let fieldsets: usize = registry
        .entity_types()
        .iter()
        .map(|entity| registry.fieldsets(entity).len())
        .sum();
    println!(
        "{} {} entity types, {} fieldsets",
        "ok".green(),
        policy.entities.len(),
        fieldsets
    );
    Ok(())
}

fn print_rejections(filtered: &Filtered) {
    for rejection in &filtered.rejected {
        eprintln!(
            "{} {} {}",
            "rejected".yellow(),
            rejection.path,
            format!("({})", rejection.entity_type).dimmed()
        );
    }
}
