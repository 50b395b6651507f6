//! Instrument Explorer - Main Entry Point
//!
//! Headless runner: launches discovery, keeps the saved-instrument list in
//! sync with what is found, and prints the instrument tree whenever it
//! changes.

use clap::Parser;
use instrument_explorer::{
    config::{self, AppConfig},
    discovery::{DiscoveryLauncher, DiscoveryScheduler, RpcInstrumentSource},
    explorer::{DiscoveryModel, Explorer, ExplorerEvent},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "instrument-explorer", version, about)]
struct Args {
    /// Configuration file (defaults to explorer.toml in the app data directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single discovery and exit, ignoring the cycle interval
    #[arg(long)]
    once: bool,

    /// Poll an already running discovery service instead of launching one
    #[arg(long)]
    no_launch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_dir = config::log_dir();
    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("instrument-explorer")
        .filename_suffix("log")
        .build(&log_dir)?;
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,instrument_explorer=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    tracing::info!("Starting Instrument Explorer");

    let config_path = args.config.unwrap_or_else(AppConfig::default_path);
    let app_config = AppConfig::load_or_default(&config_path);
    tracing::debug!("Using config {:?}", config_path);

    let store = app_config.settings_store()?;
    tracing::info!("Saved instruments in {:?}", store.path());

    let (explorer, events) = Explorer::new(DiscoveryModel::new(Box::new(store)));
    print!("{}", explorer.render()?);

    let source = RpcInstrumentSource::new(
        app_config.discovery.rpc_endpoint.clone(),
        app_config.discovery.timeout(),
    )?;
    let mut scheduler = DiscoveryScheduler::new(explorer.clone(), Arc::new(source), &app_config.discovery);
    if !args.no_launch {
        scheduler = scheduler.with_launcher(DiscoveryLauncher::from_config(&app_config.discovery));
    }
    if args.once {
        scheduler = scheduler.with_cycle_interval(None);
    }

    // Print the tree on every change
    let viewer = explorer.clone();
    std::thread::spawn(move || {
        for event in events.iter() {
            match event {
                ExplorerEvent::TreeChanged => match viewer.render() {
                    Ok(text) => println!("{}", text),
                    Err(e) => tracing::error!("Failed to render tree: {}", e),
                },
                ExplorerEvent::DiscoveryStarted => println!("Instruments discovery in progress..."),
                ExplorerEvent::DiscoveryFinished => println!("Instruments discovery finished"),
            }
        }
    });

    let token = scheduler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted");
            token.cancel();
        }
    });

    let result = scheduler.run().await;

    tracing::info!("Shutting down...");
    print!("{}", explorer.render()?);

    result.map_err(Into::into)
}
