//! Restore command - bring back the latest wallet backup

use anyhow::{bail, Result};
use dialoguer::Confirm;

use super::{get_context, runtime, wallet};
use crate::output;
use aurora_backup_core::{CancelToken, OperationResult};

pub fn run(force: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let wallet = wallet(&ctx, None)?;

    if !force && !json {
        if atty::isnt(atty::Stream::Stdin) {
            bail!("Refusing to restore without confirmation; pass --force");
        }
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Restore the latest backup into {}?",
                ctx.database_directory().display()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let cancel = CancelToken::new();
    let rt = runtime()?;
    let outcome = rt.block_on(async {
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });
        ctx.engine.restore_latest_backup(&wallet, &cancel).await
    })?;

    if json {
        output::json(&OperationResult::ok(outcome))?;
    } else {
        output::success(&format!("Wallet restored from {}", outcome.archive));
        println!("  Wallet folder: {}", outcome.wallet_folder);
        println!("  Database: {}", outcome.database_directory.display());
    }
    Ok(())
}
