//! Common error types for sndmgr

use thiserror::Error;

/// Common result type for sndmgr operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the sndmgr crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Payload is not UTF-8 text or not a JSON document
    #[error("Decode error: {0}")]
    Decode(String),

    /// Payload is valid JSON but a required field is missing or malformed
    #[error("Format error: {0}")]
    Format(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
