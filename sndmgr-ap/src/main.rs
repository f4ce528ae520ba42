//! Audio Player agent (sndmgr-ap) - Main entry point
//!
//! Subscribes to the broker, queues `sound`/`speech` commands and plays
//! sound files through an external player until Ctrl+C or SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sndmgr_ap::broker::BrokerClient;
use sndmgr_ap::cli::{Args, Mode};
use sndmgr_ap::logging::{build_info, Logging};
use sndmgr_ap::playback::{PlaybackManager, Player, ProcessPlayer, SoundLibrary};
use sndmgr_ap::queue::ChannelQueues;
use sndmgr_common::config::Config;
use sndmgr_common::Command;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Installed first so config loading is logged
    let logging = Logging::init();

    let config = args
        .resolve_config()
        .context("Failed to load configuration")?;
    logging
        .apply_level(&config.logging.level)
        .context("Failed to apply configured log level")?;

    info!(
        "Starting sndmgr-ap {} (broker {}, topics {})",
        build_info(),
        config.broker.address(),
        config.broker.subscription()
    );

    match args.mode() {
        Mode::Run => run(config).await,
        Mode::Publish { topic, payload } => publish(config, &topic, payload).await,
        Mode::Play { name } => play(config, &name).await,
    }
}

async fn run(config: Config) -> Result<()> {
    let queues = Arc::new(ChannelQueues::new());
    let broker = Arc::new(BrokerClient::new(config.broker.clone(), queues));
    let sounds =
        SoundLibrary::from_config(&config.sounds).context("Failed to resolve sound directory")?;
    info!("Sound directory: {}", sounds.dir().display());

    let player: Arc<dyn Player> = Arc::new(ProcessPlayer::new(config.player.clone()));
    let mut manager = PlaybackManager::new(broker, sounds, player);

    tokio::select! {
        _ = manager.start() => {},
        _ = shutdown_signal() => {},
    }

    manager.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

async fn publish(config: Config, topic: &str, payload: String) -> Result<()> {
    if let Err(e) = Command::from_payload(payload.as_bytes()) {
        warn!("Payload is not a valid command ({}), publishing anyway", e);
    }

    let broker = BrokerClient::new(config.broker, Arc::new(ChannelQueues::new()));
    broker.connect().await;
    broker.publish(topic, payload).await;
    broker.disconnect().await;
    Ok(())
}

async fn play(config: Config, name: &str) -> Result<()> {
    let sounds =
        SoundLibrary::from_config(&config.sounds).context("Failed to resolve sound directory")?;
    let path = sounds.resolve(name)?;

    let status = ProcessPlayer::new(config.player)
        .play_once(&path)
        .await
        .with_context(|| format!("Failed to play {}", path.display()))?;

    if !status.success() {
        anyhow::bail!("Player exited with {}", status);
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
