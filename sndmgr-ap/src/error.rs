//! Error types for sndmgr-ap
//!
//! Broker errors are transient: the agent retries them forever with a fixed
//! delay. Everything else is reported (logged) and the agent keeps running.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sndmgr-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the shared crate (configuration, payload decoding)
    #[error(transparent)]
    Common(#[from] sndmgr_common::Error),

    /// Broker unreachable or connection dropped
    #[error("Broker connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    /// Request could not be handed to the MQTT event loop
    #[error("Broker client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// Operation needs a connected client
    #[error("Broker client is not connected")]
    NotConnected,

    /// `stop` received while no playback session is recorded
    #[error("No active player to stop")]
    NoActivePlayer,

    /// Sound name escapes the sound directory
    #[error("Invalid sound name: {0}")]
    InvalidSoundName(String),

    /// External player could not be started
    #[error("Failed to start player '{program}': {source}")]
    PlayerSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Sound file missing from the sound directory
    #[error("Sound file not found: {}", .0.display())]
    SoundNotFound(PathBuf),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure should be retried rather than reported
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::Client(_) | Error::NotConnected
        )
    }
}

/// Convenience Result type using sndmgr-ap Error
pub type Result<T> = std::result::Result<T, Error>;
