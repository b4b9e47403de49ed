//! Stringy service daemon.
//!
//! Hosts `stringy.IStringy@1.0` until interrupted, registered in the shared
//! service registry so `stringycl` (or any other caller) can resolve it.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use stringy_core::{ServiceHost, ServiceRegistry, StringyService};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "stringyd")]
#[command(about = "Host the Stringy string service")]
struct Args {
    /// Registry database (defaults to the per-user config directory)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let registry = match args.registry {
        Some(path) => ServiceRegistry::open_at(&path)?,
        None => ServiceRegistry::open()?,
    };

    let removed = registry.cleanup_stale()?;
    if removed > 0 {
        info!("Removed {} stale instance entr(ies)", removed);
    }

    let mut host = ServiceHost::start(registry, Arc::new(StringyService::new())).await?;

    // Read by scripts and tests that wait for the service to come up
    println!("STRINGYD_PORT={}", host.port());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");
    host.shutdown();

    Ok(())
}
