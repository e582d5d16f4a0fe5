use std::time::Duration;

use clap::Parser;
use miette::Result;
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};

use captureshield_server::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .format_timestamp_millis()
        .init();

    log::info!("CaptureShield server {} starting", env!("CARGO_PKG_VERSION"));

    Toplevel::new(|s| async move {
        s.start(SubsystemBuilder::new("server", |subsys| {
            captureshield_server::serve(subsys, cli)
        }));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_millis(2000))
    .await
    .map_err(Into::into)
}
