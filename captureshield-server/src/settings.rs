use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use directories::ProjectDirs;

use captureshield_core::{DeniedLocationPolicy, LatLon, ShieldSettings};

use crate::{Cli, ServerError};

const ZONES_FILE_NAME: &str = "zones.json";

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocationPolicy {
    /// Keep access undecided until a real position arrives
    StayUnknown,
    /// Evaluate the fallback position instead
    UseFallback,
}

impl From<LocationPolicy> for DeniedLocationPolicy {
    fn from(policy: LocationPolicy) -> Self {
        match policy {
            LocationPolicy::StayUnknown => DeniedLocationPolicy::StayUnknown,
            LocationPolicy::UseFallback => DeniedLocationPolicy::UseFallback,
        }
    }
}

/// Parse "lat,lon" in decimal degrees
pub fn parse_lat_lon(s: &str) -> Result<LatLon, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'lat,lon', got '{}'", s))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("bad latitude '{}': {}", lat.trim(), e))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|e| format!("bad longitude '{}': {}", lon.trim(), e))?;
    LatLon::checked(lat, lon).map_err(|e| e.to_string())
}

impl Cli {
    pub fn shield_settings(&self) -> ShieldSettings {
        let defaults = ShieldSettings::default();
        ShieldSettings {
            cooldown_ms: self.cooldown.saturating_mul(1000),
            fallback_position: (!self.no_fallback).then_some(self.fallback),
            denied_policy: self.denied_location.into(),
            default_zones: if self.no_demo_zones {
                Vec::new()
            } else {
                defaults.default_zones
            },
        }
    }

    pub fn zones_path(&self) -> Result<PathBuf, ServerError> {
        if let Some(path) = &self.zones_file {
            return Ok(path.clone());
        }
        ProjectDirs::from("com", "CaptureShield", "captureshield")
            .map(|dirs| dirs.data_dir().join(ZONES_FILE_NAME))
            .ok_or(ServerError::NoDataDirectory)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval.max(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use captureshield_core::demo_zones;
    use clap::Parser;

    #[test]
    fn test_parse_lat_lon() {
        assert_eq!(
            parse_lat_lon("37.7749, -122.4191").unwrap(),
            LatLon::new(37.7749, -122.4191)
        );
        assert!(parse_lat_lon("37.7749").is_err());
        assert!(parse_lat_lon("north,east").is_err());
        assert!(parse_lat_lon("95,0").is_err());
    }

    #[test]
    fn test_default_settings() {
        let cli = Cli::parse_from(["captureshield-server"]);
        let settings = cli.shield_settings();

        assert_eq!(settings, ShieldSettings::default());
        assert_eq!(cli.poll_interval(), Duration::from_millis(250));
        assert!(cli.nmea.is_none());
    }

    #[test]
    fn test_settings_from_arguments() {
        let cli = Cli::parse_from([
            "captureshield-server",
            "--cooldown",
            "5",
            "--no-fallback",
            "--denied-location",
            "use-fallback",
            "--no-demo-zones",
            "--zones-file",
            "/tmp/z.json",
            "--nmea",
            "127.0.0.1:10110",
        ]);
        let settings = cli.shield_settings();

        assert_eq!(settings.cooldown_ms, 5_000);
        assert_eq!(settings.fallback_position, None);
        assert_eq!(settings.denied_policy, DeniedLocationPolicy::UseFallback);
        assert!(settings.default_zones.is_empty());
        assert_eq!(cli.zones_path().unwrap(), PathBuf::from("/tmp/z.json"));
        assert_eq!(cli.nmea.unwrap().port(), 10110);
    }

    #[test]
    fn test_demo_zones_kept_by_default() {
        let cli = Cli::parse_from(["captureshield-server", "--fallback", "1.5,2.5"]);
        let settings = cli.shield_settings();
        assert_eq!(settings.default_zones, demo_zones());
        assert_eq!(settings.fallback_position, Some(LatLon::new(1.5, 2.5)));
    }
}
