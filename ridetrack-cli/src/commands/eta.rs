//! ETA command - advisory arrival estimate between two points.

use chrono::{Local, Utc};
use clap::Args;
use ridetrack::geo::kmh_to_mps;
use ridetrack::tracking::{estimate_eta, Eta};
use ridetrack::{GeoFix, RideId};

use crate::error::CliError;

/// Arguments for the eta command.
#[derive(Debug, Args)]
pub struct EtaArgs {
    /// Current position as LAT,LNG
    #[arg(long, value_parser = parse_coordinates, allow_hyphen_values = true)]
    pub from: (f64, f64),

    /// Destination as LAT,LNG
    #[arg(long, value_parser = parse_coordinates, allow_hyphen_values = true)]
    pub to: (f64, f64),

    /// Current speed in km/h (standing still if omitted)
    #[arg(long)]
    pub speed_kmh: Option<f64>,
}

/// Run the eta command.
pub fn run(args: EtaArgs) -> Result<(), CliError> {
    if let Some(speed) = args.speed_kmh {
        if !speed.is_finite() || speed < 0.0 {
            return Err(CliError::InvalidArgument(format!(
                "speed must be a non-negative number, got {}",
                speed
            )));
        }
    }

    let now = Utc::now();
    let mut fix = GeoFix::new(args.from.0, args.from.1, 0.0, now);
    if let Some(speed) = args.speed_kmh {
        fix = fix.with_velocity(0.0, kmh_to_mps(speed));
    }

    print_eta(&estimate_eta(&fix.into_sample(RideId(0)), args.to, now));
    Ok(())
}

fn print_eta(eta: &Eta) {
    let secs = eta.duration.as_secs();
    println!("Distance: {:.2} km", eta.distance_m / 1000.0);
    println!("Speed:    {:.0} km/h", eta.speed_kmh);
    println!("Duration: {}m {:02}s", secs / 60, secs % 60);
    println!(
        "Arrival:  {}",
        eta.arrival.with_timezone(&Local).format("%H:%M:%S")
    );
}

/// Parse `LAT,LNG` in decimal degrees.
fn parse_coordinates(s: &str) -> Result<(f64, f64), String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got '{}'", s))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lng.trim()))?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {} out of range", lat));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(format!("longitude {} out of range", lng));
    }
    Ok((lat, lng))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinates() {
        assert_eq!(parse_coordinates("40.7128,-74.0060").unwrap(), (40.7128, -74.006));
        assert_eq!(parse_coordinates(" 1.5 , 2.5 ").unwrap(), (1.5, 2.5));
    }

    #[test]
    fn test_parse_coordinates_rejects_bad_input() {
        assert!(parse_coordinates("40.7").is_err());
        assert!(parse_coordinates("north,south").is_err());
        assert!(parse_coordinates("91,0").is_err());
        assert!(parse_coordinates("0,181").is_err());
    }
}
