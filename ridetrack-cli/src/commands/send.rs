//! Send command - queue a chat message or ride status change.
//!
//! The action is written to the local queue first, then one flush is
//! attempted. Anything not delivered stays queued for the next flush.

use clap::Subcommand;
use ridetrack::store::RideStatus;
use ridetrack::sync::SyncEngine;
use ridetrack::RideId;

use super::print_flush;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Send subcommands.
#[derive(Debug, Subcommand)]
pub enum SendAction {
    /// Send a chat message to the other ride participant
    Message {
        /// Ride id
        #[arg(long)]
        ride: RideId,

        /// Message text
        body: String,

        /// Only queue the message; deliver on the next flush
        #[arg(long)]
        no_flush: bool,
    },

    /// Change the status of a ride
    Status {
        /// Ride id
        #[arg(long)]
        ride: RideId,

        /// requested, accepted, driver_arrived, in_progress, completed or cancelled
        status: RideStatus,

        /// Only queue the change; deliver on the next flush
        #[arg(long)]
        no_flush: bool,
    },
}

/// Run a send subcommand.
pub async fn run(action: SendAction, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(debug, false)?;
    runner.log_startup("send");
    let store = runner.open_durable_store()?;
    let engine = SyncEngine::new(store, runner.http()?, runner.config().sync_config());

    let no_flush = match action {
        SendAction::Message {
            ride,
            body,
            no_flush,
        } => {
            if body.trim().is_empty() {
                return Err(CliError::InvalidArgument("message body is empty".to_string()));
            }
            let message = engine.send_message(ride, &body)?;
            println!("Queued message #{} for ride {}", message.id, ride);
            no_flush
        }
        SendAction::Status {
            ride,
            status,
            no_flush,
        } => {
            let item = engine.update_status(ride, status)?;
            println!("Queued status '{}' for ride {} (#{})", status, ride, item.id);
            no_flush
        }
    };

    if !no_flush {
        print_flush(&engine.flush().await?);
    }
    Ok(())
}
