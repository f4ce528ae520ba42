//! Commands received over the broker and the channels they arrive on
//!
//! A command is a JSON object with a required `cmd` member. `start` commands
//! also require `audio`, the sound name without extension. Members the agent
//! does not interpret are kept in [`Command::extra`] so payloads on channels
//! without a consumer (speech) survive queueing unchanged.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use serde_json::{Map, Value};
use std::fmt;

/// Logical command stream, selected by the topic suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sound,
    Speech,
}

impl Channel {
    /// Every channel the agent subscribes to, in routing order
    pub const ALL: [Channel; 2] = [Channel::Sound, Channel::Speech];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sound => "sound",
            Channel::Speech => "speech",
        }
    }

    /// Full topic for this channel under `base_topic`
    pub fn topic(&self, base_topic: &str) -> String {
        format!("{}/{}", base_topic, self.as_str())
    }

    /// Exact-match routing of a received topic.
    ///
    /// Returns `None` for anything else under the wildcard subscription,
    /// including deeper sub-topics such as `manager/sound/extra`.
    pub fn from_topic(base_topic: &str, topic: &str) -> Option<Channel> {
        Channel::ALL
            .into_iter()
            .find(|channel| channel.topic(base_topic) == topic)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of the `cmd` member
///
/// Unrecognised values are kept verbatim; the sound worker dequeues them
/// without acting on them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CommandKind {
    Start,
    Stop,
    Other(String),
}

impl From<String> for CommandKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "start" => CommandKind::Start,
            "stop" => CommandKind::Stop,
            _ => CommandKind::Other(value),
        }
    }
}

impl From<CommandKind> for String {
    fn from(kind: CommandKind) -> Self {
        match kind {
            CommandKind::Start => "start".to_string(),
            CommandKind::Stop => "stop".to_string(),
            CommandKind::Other(value) => value,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Start => f.write_str("start"),
            CommandKind::Stop => f.write_str("stop"),
            CommandKind::Other(value) => f.write_str(value),
        }
    }
}

/// Decoded broker message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub cmd: CommandKind,

    /// Sound name without extension (required for `start`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,

    /// Members not interpreted by the agent
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Command {
    /// `{"cmd": "start", "audio": <audio>}`
    pub fn start(audio: impl Into<String>) -> Self {
        Self {
            cmd: CommandKind::Start,
            audio: Some(audio.into()),
            extra: Map::new(),
        }
    }

    /// `{"cmd": "stop"}`
    pub fn stop() -> Self {
        Self {
            cmd: CommandKind::Stop,
            audio: None,
            extra: Map::new(),
        }
    }

    /// Decode a raw broker payload.
    ///
    /// Non-UTF-8 bytes and invalid JSON are [`Error::Decode`]; well-formed
    /// JSON with a missing or mistyped required member is [`Error::Format`].
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| Error::Decode(format!("payload is not UTF-8: {}", e)))?;

        let command: Command = serde_json::from_str(text).map_err(|e| match e.classify() {
            Category::Data => Error::Format(e.to_string()),
            Category::Io | Category::Syntax | Category::Eof => Error::Decode(e.to_string()),
        })?;

        command.validate()?;
        Ok(command)
    }

    /// Encode as the JSON text published on the broker
    pub fn to_payload(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Format(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.cmd == CommandKind::Start {
            match self.audio.as_deref() {
                Some(audio) if !audio.trim().is_empty() => {}
                _ => {
                    return Err(Error::Format(
                        "start command requires a non-empty `audio` field".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.audio {
            Some(audio) => write!(f, "{}({})", self.cmd, audio),
            None => write!(f, "{}", self.cmd),
        }
    }
}
