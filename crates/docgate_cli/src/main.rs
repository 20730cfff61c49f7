//! Operator command line for the docgate access engine.
//!
//! # Responsibility
//! - Expose `can-edit` and the two listing entry points against the
//!   configured SQLite database.
//! - Keep output line-oriented and deterministic for scripting.
//!
//! # Exit codes
//! - `0`: command succeeded (for `can-edit`: edit allowed).
//! - `1`: `can-edit` denied.
//! - `2`: configuration, database, or lookup error.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docgate_core::{AccessCache, AccessService, Config, EditDecision, EditGrant, SharedBasis};
use log::info;
use std::process::ExitCode;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "docgate")]
#[command(about = "Document edit-authorization checks")]
#[command(after_help = "\
CONFIGURATION:
  DOCGATE_DB_PATH           SQLite database file (default: docgate.sqlite3)
  DOCGATE_BUSY_TIMEOUT_MS   Lock wait in milliseconds (default: 5000)
  DOCGATE_LOG_LEVEL         trace|debug|info|warn|error
  DOCGATE_LOG_DIR           Absolute log directory; logging is off when unset")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check core linkage and print the version
    Ping,
    /// Decide whether an account may edit a document
    CanEdit {
        #[arg(long, value_name = "UUID")]
        account: Uuid,
        #[arg(long, value_name = "UUID")]
        document: Uuid,
    },
    /// List projects shared with an account
    Projects {
        #[arg(long, value_name = "UUID")]
        account: Uuid,
    },
    /// List documents reachable through an account's shared projects
    Documents {
        #[arg(long, value_name = "UUID")]
        account: Uuid,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    if let Commands::Ping = command {
        println!("docgate_core ping={}", docgate_core::ping());
        println!("docgate_core version={}", docgate_core::core_version());
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::from_env().context("invalid configuration")?;
    config
        .logging
        .init()
        .context("failed to initialize logging")?;
    let mut conn = config
        .database
        .open()
        .with_context(|| format!("failed to open {}", config.database.path.display()))?;
    info!(
        "event=cli_start module=cli status=ok db_path={}",
        config.database.path.display()
    );

    let mut service = AccessService::new(&mut conn, Arc::new(AccessCache::new()));
    match command {
        Commands::Ping => Ok(ExitCode::SUCCESS),
        Commands::CanEdit { account, document } => {
            let decision = service.evaluate_edit(account, document)?;
            println!("{}", describe(&decision));
            if let Some(invalid) = decision.invalid_access_level {
                eprintln!("warning: {invalid}");
            }
            Ok(if decision.allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Commands::Projects { account } => {
            for id in service.accessible_project_ids(account)? {
                println!("{id}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Documents { account } => {
            for id in service.accessible_document_ids(account)? {
                println!("{id}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn describe(decision: &EditDecision) -> String {
    match decision.grant {
        None => "denied".to_string(),
        Some(EditGrant::Owner) => "allowed grant=owner".to_string(),
        Some(EditGrant::Administrator) => "allowed grant=administrator".to_string(),
        Some(EditGrant::Shared {
            collaborator,
            basis,
        }) => {
            let basis = match basis {
                SharedBasis::CollaboratorOwns => "owns",
                SharedBasis::CollaboratorAdministers => "administers",
            };
            format!("allowed grant=shared collaborator={collaborator} basis={basis}")
        }
    }
}
