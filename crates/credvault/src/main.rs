// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! credvault - operator CLI for the credential vault and its audit trail.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod audit_cmd;
mod check;
mod credentials;
mod prompt;

use clap::{Parser, Subcommand};
use credvault_audit::AuditTrail;
use credvault_config::CredvaultConfig;
use credvault_core::{CredvaultError, Environment};
use credvault_vault::CredentialVault;

/// credvault - OpenPGP credential vault with a signed audit trail.
#[derive(Parser, Debug)]
#[command(name = "credvault", version, about, long_about = None)]
struct Cli {
    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the key, the credential file, and an encryption round trip.
    Check,
    /// Encrypt and store a new API key.
    Store {
        /// Deployment environment the key belongs to.
        #[arg(long)]
        environment: Environment,
        /// Rotation schedule label, e.g. `monthly`.
        #[arg(long, default_value = "monthly")]
        rotation_schedule: String,
    },
    /// Decrypt the stored credentials and print masked previews.
    Load {
        /// Bypass the credential cache.
        #[arg(long)]
        no_cache: bool,
    },
    /// Query and maintain the audit log.
    Audit {
        #[command(subcommand)]
        command: audit_cmd::AuditCommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match credvault_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            credvault_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);
    credvault_audit::recording::register_metrics();

    match run(cli, &config).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("credvault: {e}");
            std::process::exit(1);
        }
    }
}

/// Dispatch a parsed command. `Ok(false)` means the command ran but found
/// problems.
async fn run(cli: Cli, config: &CredvaultConfig) -> Result<bool, CredvaultError> {
    let audit = AuditTrail::from_config(&config.audit)?;

    let outcome = match cli.command {
        Commands::Check => {
            let vault = CredentialVault::from_config(config, audit.clone())?;
            check::run_check(&vault, cli.plain).await
        }
        Commands::Store {
            environment,
            rotation_schedule,
        } => {
            let vault = CredentialVault::from_config(config, audit.clone())?;
            let api_key = prompt::read_api_key()?;
            credentials::run_store(&vault, api_key, environment, rotation_schedule).await?;
            true
        }
        Commands::Load { no_cache } => {
            let vault = CredentialVault::from_config(config, audit.clone())?;
            credentials::run_load(&vault, no_cache).await?;
            true
        }
        Commands::Audit { command } => audit_cmd::run_audit(&audit, command).await?,
    };

    // Let queued alerts reach their handler before the process exits.
    audit.flush().await;
    Ok(outcome)
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("credvault={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn parses_store_with_environment() {
        let cli = Cli::try_parse_from([
            "credvault",
            "store",
            "--environment",
            "staging",
            "--rotation-schedule",
            "quarterly",
        ])
        .unwrap();
        match cli.command {
            Commands::Store {
                environment,
                rotation_schedule,
            } => {
                assert_eq!(environment, Environment::Staging);
                assert_eq!(rotation_schedule, "quarterly");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_environment() {
        assert!(Cli::try_parse_from(["credvault", "store", "--environment", "qa"]).is_err());
    }

    #[test]
    fn parses_audit_subcommands() {
        let cli = Cli::try_parse_from(["credvault", "--plain", "audit", "recent", "--hours", "6"])
            .unwrap();
        assert!(cli.plain);
        assert!(matches!(
            cli.command,
            Commands::Audit {
                command: audit_cmd::AuditCommand::Recent { hours: 6 }
            }
        ));

        for sub in ["alerts", "metrics", "threats", "verify", "rotate", "prune"] {
            assert!(
                Cli::try_parse_from(["credvault", "audit", sub]).is_ok(),
                "{sub}"
            );
        }
    }

    #[test]
    fn load_defaults_to_cached() {
        let cli = Cli::try_parse_from(["credvault", "load"]).unwrap();
        assert!(matches!(cli.command, Commands::Load { no_cache: false }));
    }
}
