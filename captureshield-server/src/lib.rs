//! CaptureShield Server
//!
//! Native host for `captureshield-core`. It supplies the platform
//! capabilities the core asks for and exposes the shield over HTTP:
//!
//! - positions from NMEA 0183 sentences received over UDP ([`nmea`])
//! - a capture device node as the camera ([`camera`])
//! - the zone list as a JSON file ([`storage`])
//! - one controller task that owns the shield ([`controller`])
//! - a REST API and a WebSocket event stream ([`web`])

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle};

use captureshield_core::{CaptureShield, LatLon, StorageError};

pub mod camera;
pub mod controller;
pub mod nmea;
pub mod settings;
pub mod storage;
pub mod web;

use camera::DeviceCamera;
use controller::ShieldRunner;
use nmea::LocationBackend;
use settings::LocationPolicy;
use storage::JsonFileStorage;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Port for the HTTP API
    #[arg(short, long, default_value_t = 6510)]
    pub port: u16,

    /// Zone list file (default: zones.json in the user data directory)
    #[arg(long)]
    pub zones_file: Option<PathBuf>,

    /// UDP address to receive NMEA 0183 sentences on, e.g. 0.0.0.0:10110.
    /// Without it the server has no location source.
    #[arg(long)]
    pub nmea: Option<SocketAddr>,

    /// Capture device node
    #[arg(long, default_value = "/dev/video0")]
    pub camera_device: PathBuf,

    /// Minimum seconds between access-change notifications
    #[arg(long, default_value_t = 60)]
    pub cooldown: u64,

    /// Position assumed when no location is available, as "lat,lon"
    #[arg(long, value_parser = settings::parse_lat_lon, default_value = "37.7749,-122.4191")]
    pub fallback: LatLon,

    /// Never assume a fallback position
    #[arg(long)]
    pub no_fallback: bool,

    /// What to do when location permission is denied
    #[arg(long, value_enum, default_value_t = LocationPolicy::StayUnknown)]
    pub denied_location: LocationPolicy,

    /// Milliseconds between location polls
    #[arg(long, default_value_t = 250)]
    pub poll_interval: u64,

    /// Start with an empty zone list instead of the demo zones
    #[arg(long)]
    pub no_demo_zones: bool,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("No user data directory, use --zones-file")]
    NoDataDirectory,
    #[error("Shield controller is not running")]
    ControllerGone,
}

/// Wall clock in milliseconds since the epoch
pub fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Build the shield from the command line and serve it until shutdown
pub async fn serve(subsys: SubsystemHandle, cli: Cli) -> Result<(), ServerError> {
    let zones_path = cli.zones_path()?;
    log::info!("Zones are stored in {}", zones_path.display());

    let location = match cli.nmea {
        Some(addr) => LocationBackend::nmea(addr),
        None => {
            log::warn!("No NMEA source configured, location is unavailable");
            LocationBackend::Unavailable
        }
    };
    let camera = DeviceCamera::new(&cli.camera_device);
    let storage = JsonFileStorage::new(zones_path);

    let shield = CaptureShield::new(location, camera, storage, cli.shield_settings());
    let (runner, handle) = ShieldRunner::new(shield, cli.poll_interval());
    subsys.start(SubsystemBuilder::new("shield", |s| runner.run(s)));

    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, cli.port))).await?;
    log::info!("HTTP API listening on {}", listener.local_addr()?);

    axum::serve(listener, web::router(handle))
        .with_graceful_shutdown(async move { subsys.on_shutdown_requested().await })
        .await?;
    Ok(())
}
