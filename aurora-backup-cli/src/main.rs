//! Aurora Backup CLI - wallet cloud backups from the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use aurora_backup_core::OperationResult;
use commands::{create, list, logs, restore, status};

/// Aurora Backup - back up and restore wallet databases through a synchronized container
#[derive(Parser)]
#[command(name = "aurora-backup", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether a wallet has a backup
    Status {
        /// Wallet public key (hex)
        #[arg(long, env = "AURORA_WALLET_PUBLIC_KEY")]
        public_key: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a backup and copy it into the container
    Create {
        /// Wallet public key (hex)
        #[arg(long, env = "AURORA_WALLET_PUBLIC_KEY")]
        public_key: String,
        /// Wait for the upload to finish
        #[arg(long)]
        wait: bool,
        /// Keep only the newest N backups of this wallet
        #[arg(long)]
        keep: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List wallet backups in the container
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Restore the latest backup into the local wallet directory
    Restore {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the backup event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn json(&self) -> bool {
        match self {
            Commands::Status { json, .. }
            | Commands::Create { json, .. }
            | Commands::List { json }
            | Commands::Restore { json, .. } => *json,
            Commands::Logs { command } => command.json(),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("AURORA_BACKUP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.command.json();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                let failure = OperationResult::<()>::fail(format!("{:#}", e));
                if output::json(&failure).is_err() {
                    eprintln!("{:#}", e);
                }
            } else {
                eprintln!("{:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { public_key, json } => status::run(&public_key, json),
        Commands::Create { public_key, wait, keep, json } => create::run(&public_key, wait, keep, json),
        Commands::List { json } => list::run(json),
        Commands::Restore { force, json } => restore::run(force, json),
        Commands::Logs { command } => logs::run(command),
    }
}
