use color_eyre::{eyre::eyre, Result};
use joybridge::config::AppConfig;
use joybridge::controller::event_collector::{CollectorHandle, CollectorSettings};
use joybridge::publish::TracingSink;
use joybridge::BridgeSession;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = AppConfig::default_path();
    info!("Loading configuration from {}", config_path.display());
    let config = AppConfig::load_from(&config_path)
        .await
        .map_err(|e| eyre!("Failed to load configuration: {}", e))?;
    info!("Configuration: {:?}", config);

    let sink = Arc::new(TracingSink::new());
    let mut session = BridgeSession::new(config, sink);

    // Without a gamepad the loop still publishes neutral frames
    let collector = match CollectorHandle::spawn(
        Some(CollectorSettings::default()),
        session.capture().clone(),
    )
    .await
    {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Gamepad input unavailable: {}", e);
            None
        }
    };

    session
        .start()
        .map_err(|e| eyre!("Failed to start publish loop: {}", e))?;

    info!("Bridge running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to wait for Ctrl-C: {}", e))?;

    info!("Shutting down");
    session.shutdown().await;
    if let Some(collector) = collector {
        collector.shutdown();
    }
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
