//! Local store maintenance CLI commands.

use std::time::Duration;

use chrono::Local;
use clap::Subcommand;
use ridetrack::sync::SyncEngine;

use super::print_flush;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Sync action subcommands.
#[derive(Debug, Subcommand)]
pub enum SyncAction {
    /// Deliver every pending position and queued action over HTTP
    Flush,
    /// Show what the local store holds
    Status,
    /// Delete synced records older than the retention window
    Purge {
        /// Retention in hours (default: sync.purge_after_hours)
        #[arg(long)]
        older_than_hours: Option<u64>,
    },
}

/// Run a sync subcommand.
pub async fn run(action: SyncAction, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(debug, false)?;
    runner.log_startup("sync");
    let store = runner.open_durable_store()?;

    match action {
        SyncAction::Flush => {
            let engine = SyncEngine::new(store, runner.http()?, runner.config().sync_config());
            let report = engine.flush().await?;
            print_flush(&report);
            Ok(())
        }
        SyncAction::Status => {
            let stats = store.stats()?;
            println!("Local store: {}", runner.config().store.path.display());
            println!("  Pending positions:  {}", stats.pending_positions);
            println!("  Synced positions:   {}", stats.synced_positions);
            println!("  Unsynced messages:  {}", stats.unsynced_messages);
            println!("  Cached rides:       {}", stats.rides);
            println!("  Queued actions:     {}", stats.queued_actions);

            for item in store.queue_items()? {
                println!(
                    "    #{} {} (attempts: {}, queued {})",
                    item.id,
                    item.kind,
                    item.attempts,
                    item.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                );
            }
            Ok(())
        }
        SyncAction::Purge { older_than_hours } => {
            let age = older_than_hours
                .map(|h| Duration::from_secs(h * 3600))
                .unwrap_or_else(|| runner.config().purge_after());
            let report = store.purge_older_than(age)?;
            println!(
                "Purged {} positions and {} messages synced more than {} hours ago",
                report.positions,
                report.messages,
                age.as_secs() / 3600
            );
            Ok(())
        }
    }
}
