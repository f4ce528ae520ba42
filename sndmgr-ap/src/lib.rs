//! # sndmgr Audio Player Library (sndmgr-ap)
//!
//! Message-driven playback agent.
//!
//! **Purpose:** Receive `start`/`stop` commands from an MQTT broker, queue them
//! per channel, and drive an external player process for the sound channel.
//!
//! **Architecture:** [`broker::BrokerClient`] (rumqttc event loop task) fills
//! [`queue::ChannelQueues`]; [`playback::PlaybackManager`] consumes the sound
//! queue on the main task.

pub mod broker;
pub mod cli;
pub mod error;
pub mod logging;
pub mod playback;
pub mod queue;

pub use error::{Error, Result};
