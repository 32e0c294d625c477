//! Create command - back up the wallet database to the container

use std::time::{Duration, Instant};

use anyhow::Result;
use colored::Colorize;

use super::{get_context, runtime, wallet, ProgressBarObserver};
use crate::output;
use aurora_backup_core::{OperationResult, SyncState};

pub fn run(public_key: &str, wait: bool, keep: Option<usize>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let wallet = wallet(&ctx, Some(public_key))?;
    let rt = runtime()?;

    let archive = rt.block_on(ctx.engine.create_backup(&wallet))?;

    let mut state = ctx.engine.state();
    if wait {
        let observer = (!json).then(|| ProgressBarObserver::new(&archive.name));
        let id = observer.as_ref().map(|o| ctx.engine.add_observer(o));

        let deadline = Instant::now() + ctx.config.download_options().timeout;
        state = rt.block_on(async {
            loop {
                let state = ctx.engine.state();
                if state.is_terminal() || Instant::now() >= deadline {
                    return state;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        });

        if let Some(id) = id {
            ctx.engine.remove_observer(id);
        }
    }

    let pruned = match keep {
        Some(keep) => ctx.engine.prune_backups(&wallet, keep)?,
        None => Vec::new(),
    };
    ctx.engine.stop_watching();

    if json {
        let mut result = OperationResult::ok(&archive)
            .with_context("state", serde_json::to_value(state)?)
            .with_context("pruned", serde_json::to_value(&pruned)?);
        if let Some(error) = ctx.engine.progress().error {
            result = result.with_context("uploadError", error.to_string().into());
        }
        return output::json(&result);
    }

    println!("{}", "Backup created".green());
    println!("  Name: {}", archive.name);
    println!("  Size: {}", archive.size_display());
    println!("  SHA-256: {}", archive.sha256);
    match state {
        SyncState::Completed => output::success("Upload complete"),
        SyncState::Failed => {
            let progress = ctx.engine.progress();
            let reason = progress
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            output::warning(&format!("Upload failed: {}", reason));
        }
        _ if wait => output::warning("Upload still in progress; the provider will finish it in the background"),
        _ => output::info("Upload continues in the background"),
    }
    if !pruned.is_empty() {
        println!("  Pruned {} older backup(s)", pruned.len());
    }
    Ok(())
}
