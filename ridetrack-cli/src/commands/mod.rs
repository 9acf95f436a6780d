//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (get, set, list, path)
//! - [`eta`] - Arrival estimate between two points
//! - [`locate`] - Single position fix
//! - [`send`] - Queue chat messages and ride status changes
//! - [`sync`] - Local store maintenance (flush, status, purge)
//! - [`track`] - Run a tracking session

pub mod config;
pub mod eta;
pub mod locate;
pub mod send;
pub mod sync;
pub mod track;

use ridetrack::sync::FlushReport;

/// Print a one-line flush outcome.
pub(crate) fn print_flush(report: &FlushReport) {
    println!(
        "Flushed: {} positions in {} batches, {} actions delivered",
        report.positions_synced, report.batches_sent, report.actions_delivered
    );
    if report.batches_failed > 0 {
        println!("  {} batch(es) failed and stay pending", report.batches_failed);
    }
    if report.actions_requeued > 0 {
        println!("  {} action(s) will be retried", report.actions_requeued);
    }
    if report.actions_dropped > 0 {
        println!("  {} action(s) dropped after repeated failures", report.actions_dropped);
    }
}
