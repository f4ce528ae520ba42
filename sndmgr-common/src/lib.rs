//! # sndmgr Common Library
//!
//! Shared code for the sndmgr playback agent:
//! - Command and channel types carried over the broker
//! - Bootstrap configuration loading (TOML + built-in defaults)
//! - Common error type

pub mod command;
pub mod config;
pub mod error;

pub use command::{Channel, Command, CommandKind};
pub use config::Config;
pub use error::{Error, Result};
