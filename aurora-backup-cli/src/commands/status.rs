//! Status command - is this wallet backed up

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use super::{get_context, wallet};
use crate::output;
use aurora_backup_core::ports::WalletEngine;
use aurora_backup_core::OperationResult;

#[derive(Serialize)]
struct StatusSummary {
    wallet_folder: String,
    backup_present: bool,
    archives: usize,
    latest_archive: Option<String>,
    container: String,
}

pub fn run(public_key: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let wallet = wallet(&ctx, Some(public_key))?;
    let identity = wallet.public_identity();
    let folder = identity
        .as_ref()
        .map(|id| ctx.engine.resolver().remote_folder_name(id))
        .unwrap_or_default();

    let backup_present = ctx.engine.is_backup_present(&wallet);
    let backups = ctx.engine.list_backups().unwrap_or_default();
    let mine = backups.iter().find(|b| b.folder == folder);

    let summary = StatusSummary {
        backup_present,
        archives: mine.map(|b| b.archives.len()).unwrap_or(0),
        latest_archive: mine.and_then(|b| b.latest()).map(|a| a.materialized_name()),
        container: ctx.config.container_identifier.clone(),
        wallet_folder: folder,
    };

    if json {
        return output::json(&OperationResult::ok(summary));
    }

    println!("{}", "Backup Status".bold());
    println!("  Container: {}", summary.container);
    if let Some(id) = &identity {
        println!("  Wallet: {}", id.short());
    }
    if summary.backup_present {
        println!("  Backed up: {}", "yes".green());
        println!("  Archives: {}", summary.archives);
        if let Some(latest) = &summary.latest_archive {
            println!("  Latest: {}", latest);
        }
    } else {
        println!("  Backed up: {}", "no".red());
    }
    Ok(())
}
