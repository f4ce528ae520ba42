//! Command-line arguments for sndmgr-ap
//!
//! Arguments and their environment variables override the TOML file, which
//! overrides built-in defaults.

use clap::{Parser, Subcommand};
use sndmgr_common::config::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sndmgr-ap")]
#[command(about = "Message-driven audio playback agent")]
#[command(version)]
pub struct Args {
    /// TOML configuration file (default: platform config directory)
    #[arg(short, long, env = "SNDMGR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Broker host name or address
    #[arg(long, env = "SNDMGR_BROKER_HOST", global = true)]
    pub host: Option<String>,

    /// Broker port
    #[arg(short, long, env = "SNDMGR_BROKER_PORT", global = true)]
    pub port: Option<u16>,

    /// Directory containing the sound files
    #[arg(long, env = "SNDMGR_SOUND_DIR", global = true)]
    pub sound_dir: Option<PathBuf>,

    /// External player program; replaces the configured program and its arguments
    #[arg(long, env = "SNDMGR_PLAYER", global = true)]
    pub player: Option<String>,

    #[command(subcommand)]
    pub mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Run the agent (default)
    Run,

    /// Publish one message and exit
    Publish {
        /// Topic, e.g. manager/sound
        topic: String,
        /// Payload, e.g. '{"cmd":"start","audio":"chime"}'
        payload: String,
    },

    /// Play one sound once through the configured player, without the broker
    Play {
        /// Sound name without extension
        name: String,
    },
}

impl Args {
    pub fn mode(&self) -> Mode {
        self.mode.clone().unwrap_or(Mode::Run)
    }

    /// Load the TOML configuration and apply argument overrides
    pub fn resolve_config(&self) -> sndmgr_common::Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Apply argument/environment overrides on top of `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.broker.host = host.clone();
        }
        if let Some(port) = self.port {
            config.broker.port = port;
        }
        if let Some(dir) = &self.sound_dir {
            config.sounds.dir = Some(dir.clone());
        }
        if let Some(program) = &self.player {
            config.player.program = program.clone();
            config.player.args.clear();
        }
    }
}
