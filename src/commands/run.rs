//! Run command implementation.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::controller::{Controller, Stop};
use crate::fetcher::HttpFetcher;
use crate::lock::LockGuard;
use crate::session::PeerSession;
use crate::signal;
use crate::store::FileStore;

/// Run the controller until the peer or a signal stops it, or for a single
/// cycle when detached.
pub async fn run(config_path: &Path, dry_run: bool) -> Result<Stop> {
    let config = Config::load(config_path)?;

    let attached = is_attached(dry_run);
    let token = signal::install(attached);

    let _lock = LockGuard::acquire(&config.cache_dir())?;

    let formatter = config.formatter()?;
    let fetcher = HttpFetcher::new()?;
    info!(
        "Starting {} controller ({})",
        formatter.method_name(),
        if attached { "attached" } else { "detached" }
    );

    let mut controller = Controller::new(
        config.sources(),
        formatter,
        PeerSession::stdio(attached),
        Box::new(fetcher),
        Box::new(FileStore),
    );

    let stop = controller
        .run(&token)
        .await
        .context("Controller stopped")?;

    match stop {
        Stop::PeerShutdown => info!("Peer shut down, exiting"),
        Stop::Signal => info!("Terminated, exiting"),
        Stop::SingleCycle => info!("Single cycle done"),
    }
    Ok(stop)
}

/// A routing daemon talks to us through a pipe; a terminal means a human
/// started us by hand.
pub fn is_attached(dry_run: bool) -> bool {
    !dry_run && !stdout_is_terminal()
}

fn stdout_is_terminal() -> bool {
    unsafe { libc::isatty(libc::STDOUT_FILENO) == 1 }
}
