mod bootstrap;
mod health;
mod service;

use anyhow::Result;
use recap_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use recap_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // A missing .env file is fine; deployments set real environment variables.
    let _ = dotenvy::dotenv();

    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Now bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config)?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.transport.clone(),
    )
    .await?;

    tracing::info!(
        event_name = "system.server.started",
        strategy = ?app.config.summary.strategy,
        "recap-server started"
    );

    tokio::select! {
        result = app.runner.start() => {
            tracing::info!(
                event_name = "system.server.socket_finished",
                "socket mode runner finished"
            );
            result?;
        }
        signal = wait_for_shutdown() => {
            tracing::info!(event_name = "system.server.stopping", "recap-server stopping");
            signal?;
        }
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
