//! Locate command - obtain a single position fix.

use chrono::Local;
use clap::Args;
use ridetrack::geo::mps_to_kmh;
use ridetrack::sampler::{GeoSampler, ProfileKind};
use ridetrack::GeoFix;
use std::path::PathBuf;

use crate::error::CliError;
use crate::runner::{CliRunner, SamplerChoice};

/// Arguments for the locate command.
#[derive(Debug, Args)]
pub struct LocateArgs {
    /// Sampling profile: high-accuracy, continuous or quick
    #[arg(long)]
    pub profile: Option<ProfileKind>,

    /// Read the fix from a recorded track instead of the configured source
    #[arg(long)]
    pub replay: Option<PathBuf>,
}

/// Run the locate command.
pub async fn run(args: LocateArgs, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(debug, false)?;
    runner.log_startup("locate");

    let profile = args
        .profile
        .unwrap_or(runner.config().tracking.accuracy_profile);

    let fix = match runner.sampler(args.replay, None)? {
        SamplerChoice::Gpsd(sampler) => locate(&sampler, profile).await?,
        SamplerChoice::Replay(sampler) => locate(&sampler, profile).await?,
    };

    println!("Latitude:  {:.6}", fix.lat);
    println!("Longitude: {:.6}", fix.lng);
    println!("Accuracy:  ±{:.0} m", fix.accuracy);
    if let Some(speed) = fix.speed {
        println!("Speed:     {:.1} km/h", mps_to_kmh(speed));
    }
    if let Some(heading) = fix.heading {
        println!("Heading:   {:.0}°", heading);
    }
    println!(
        "Captured:  {}",
        fix.captured_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

async fn locate<S: GeoSampler>(sampler: &S, profile: ProfileKind) -> Result<GeoFix, CliError> {
    sampler.check_permission().await?;
    println!("Locating ({})...", profile);
    Ok(sampler.current_position(profile.profile()).await?)
}
