//! List command - wallet folders and archives in the container

use anyhow::Result;

use super::get_context;
use crate::output;
use aurora_backup_core::OperationResult;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let backups = ctx.engine.list_backups()?;

    if json {
        return output::json(&OperationResult::ok(backups));
    }

    if backups.is_empty() {
        println!("No backups found.");
        return Ok(());
    }

    let resolver = ctx.engine.resolver();
    let mut table = output::create_table();
    table.set_header(vec!["Wallet", "Archive", "Created", "Local"]);

    for wallet in &backups {
        // Newest first, like the restore picks them
        for archive in wallet.archives.iter().rev() {
            let created = resolver
                .archive_time(archive)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            table.add_row(vec![
                wallet.folder.clone(),
                archive.materialized_name(),
                created,
                if archive.is_placeholder { "no" } else { "yes" }.to_string(),
            ]);
        }
    }

    println!("{}", table);
    Ok(())
}
