//! Logs command - backup history from the event log

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use super::get_data_dir;
use crate::output;
use aurora_backup_core::services::{EntryPoint, LogEntry, LogFilter, LoggingService};
use aurora_backup_core::{OperationResult, WalletIdentity};

const UPLOAD_EVENTS: [&str; 3] = ["backup_created", "upload_completed", "upload_failed"];

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show backup and restore events, newest first
    History {
        /// Only events for this wallet public key (hex)
        #[arg(long)]
        wallet: Option<String>,
        /// Only this event, e.g. upload_failed
        #[arg(long)]
        event: Option<String>,
        /// Show only failures
        #[arg(long)]
        errors: bool,
        /// Only events from the last N days
        #[arg(long)]
        since_days: Option<u64>,
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show where each recent archive's upload ended up
    Uploads {
        /// Only archives of this wallet public key (hex)
        #[arg(long)]
        wallet: Option<String>,
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete events older than N days
    Prune {
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy the event log database for a support request
    Export {
        /// Destination file
        output: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl LogsCommands {
    pub fn json(&self) -> bool {
        match self {
            LogsCommands::History { json, .. }
            | LogsCommands::Uploads { json, .. }
            | LogsCommands::Prune { json, .. }
            | LogsCommands::Export { json, .. } => *json,
        }
    }
}

fn get_logging_service() -> Result<LoggingService> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    Ok(LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))?)
}

/// Wallet folders are hex public keys
fn wallet_folder(public_key: Option<String>) -> Result<Option<String>> {
    Ok(public_key
        .map(|key| WalletIdentity::parse(&key))
        .transpose()?
        .map(|id| id.as_hex().to_string()))
}

fn short_folder(folder: Option<&str>) -> String {
    match folder {
        Some(folder) => WalletIdentity::parse(folder)
            .map(|id| id.short())
            .unwrap_or_else(|_| folder.to_string()),
        None => String::new(),
    }
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn outcome(entry: &LogEntry) -> String {
    if let Some(message) = &entry.error_message {
        return format!("{} {}", "failed:".red(), message);
    }
    match entry.event.as_str() {
        "backup_created" => "waiting for upload".yellow().to_string(),
        "upload_completed" => "uploaded".green().to_string(),
        "restore_completed" => "restored".green().to_string(),
        "backups_pruned" => entry.error_details.clone().unwrap_or_default(),
        _ => String::new(),
    }
}

/// Newest upload-related event per archive
fn latest_per_archive(entries: Vec<LogEntry>, limit: usize) -> Vec<LogEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| UPLOAD_EVENTS.contains(&e.event.as_str()))
        .filter(|e| match &e.archive {
            Some(archive) => seen.insert(archive.clone()),
            None => false,
        })
        .take(limit)
        .collect()
}

fn print_entries(entries: &[LogEntry]) {
    let mut table = output::create_table();
    table.set_header(vec!["Time", "Event", "Wallet", "Archive", "Outcome"]);
    for entry in entries {
        table.add_row(vec![
            format_timestamp(entry.timestamp),
            entry.event.clone(),
            short_folder(entry.wallet_folder.as_deref()),
            entry.archive.clone().unwrap_or_default(),
            outcome(entry),
        ]);
    }
    println!("{}", table);
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = get_logging_service()?;

    match command {
        LogsCommands::History {
            wallet,
            event,
            errors,
            since_days,
            limit,
            json,
        } => {
            let filter = LogFilter {
                wallet_folder: wallet_folder(wallet)?,
                event,
                errors_only: errors,
                since_ms: since_days
                    .map(|days| (Utc::now() - Duration::days(days as i64)).timestamp_millis()),
                limit,
            };
            let entries = service.query(&filter)?;

            if json {
                return output::json(&OperationResult::ok(entries));
            }
            if entries.is_empty() {
                println!("No backup events found.");
                return Ok(());
            }
            print_entries(&entries);
        }
        LogsCommands::Uploads { wallet, limit, json } => {
            let filter = LogFilter {
                wallet_folder: wallet_folder(wallet)?,
                limit: limit.saturating_mul(UPLOAD_EVENTS.len()).max(limit),
                ..LogFilter::default()
            };
            let latest = latest_per_archive(service.query(&filter)?, limit);

            if json {
                return output::json(&OperationResult::ok(latest));
            }
            if latest.is_empty() {
                println!("No uploads recorded.");
                return Ok(());
            }
            print_entries(&latest);

            let pending = latest.iter().filter(|e| e.event == "backup_created").count();
            if pending > 0 {
                output::info(&format!(
                    "{} archive(s) had no upload result when the recording process exited",
                    pending
                ));
            }
        }
        LogsCommands::Prune {
            older_than_days,
            force,
            json,
        } => {
            if !force && !json {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete backup events older than {} days?", older_than_days))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let cutoff_ms = (Utc::now() - Duration::days(older_than_days as i64)).timestamp_millis();
            let deleted = service.delete_before(cutoff_ms)?;

            if json {
                return output::json(
                    &OperationResult::ok(deleted).with_context("remaining", service.count()?.into()),
                );
            }
            output::success(&format!("Deleted {} event(s)", deleted));
        }
        LogsCommands::Export { output: path, json } => {
            let exported = service.export(&path)?;
            let count = service.count()?;

            if json {
                return output::json(
                    &OperationResult::ok(exported.display().to_string())
                        .with_context("entries", count.into()),
                );
            }
            output::success(&format!("Exported {} event(s) to {}", count, exported.display()));
        }
    }

    Ok(())
}
