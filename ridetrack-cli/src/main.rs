//! ridetrack CLI - Command-line interface
//!
//! This binary drives the ridetrack library: tracking sessions, local store
//! maintenance, single fixes, ETA estimates and configuration.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::eta::EtaArgs;
use commands::locate::LocateArgs;
use commands::send::SendAction;
use commands::sync::SyncAction;
use commands::track::TrackArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "ridetrack")]
#[command(version = ridetrack::VERSION)]
#[command(about = "Ride position tracking with offline sync", long_about = None)]
struct Cli {
    /// Enable debug logging regardless of RUST_LOG
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a ride until Ctrl-C, the end of a replay or --duration
    Track(TrackArgs),

    /// Print a single position fix
    Locate(LocateArgs),

    /// Inspect and deliver the local store
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },

    /// Estimate arrival time between two points
    Eta(EtaArgs),

    /// Queue a chat message or ride status change
    Send {
        #[command(subcommand)]
        action: SendAction,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Track(args) => commands::track::run(args, cli.debug).await,
        Commands::Locate(args) => commands::locate::run(args, cli.debug).await,
        Commands::Sync { action } => commands::sync::run(action, cli.debug).await,
        Commands::Eta(args) => commands::eta::run(args),
        Commands::Send { action } => commands::send::run(action, cli.debug).await,
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
