//! rsbar entrypoint: parse options, set up logging, then hand stdout to the
//! engine until the bar tells us to stop.

use anyhow::Result;
use std::io;

use rsbar::config::AppConfig;
use rsbar::{init_tracing, print_config, run_bar};

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_tracing(&config);

    if config.print_config {
        let stdout = io::stdout();
        return print_config(&config, &mut stdout.lock());
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rsbar starting");
    if let Err(err) = run_bar(&config) {
        tracing::error!("rsbar failed: {err:#}");
        return Err(err);
    }
    Ok(())
}
