//! Sound worker: turns queued sound commands into playback sessions
//!
//! States: `Idle` (no recorded session) and `Playing`.
//! - `start` while Idle: spawn a session, Playing
//! - `start` while Playing: spawn a new session and record it; the previous
//!   session keeps playing and is no longer tracked
//! - `stop` while Playing: terminate the recorded session, Idle
//! - `stop` while Idle: [`Error::NoActivePlayer`], state unchanged
//! - any other `cmd`: dequeued, no action

use crate::broker::BrokerClient;
use crate::error::{Error, Result};
use crate::playback::player::{PlaybackSession, Player};
use crate::playback::sounds::SoundLibrary;
use crate::queue::ChannelQueues;
use sndmgr_common::{Command, CommandKind};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Playback state of the sound worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
}

pub struct PlaybackManager {
    broker: Arc<BrokerClient>,
    queues: Arc<ChannelQueues>,
    sounds: SoundLibrary,
    player: Arc<dyn Player>,
    session: Option<Box<dyn PlaybackSession>>,
}

impl PlaybackManager {
    /// The manager consumes from the queues the broker client fills
    pub fn new(broker: Arc<BrokerClient>, sounds: SoundLibrary, player: Arc<dyn Player>) -> Self {
        let queues = Arc::clone(broker.queues());
        Self {
            broker,
            queues,
            sounds,
            player,
            session: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        if self.session.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        }
    }

    /// Currently recorded session
    pub fn session(&self) -> Option<&dyn PlaybackSession> {
        self.session.as_deref()
    }

    pub fn queues(&self) -> &Arc<ChannelQueues> {
        &self.queues
    }

    /// Connect to the broker (retrying until it succeeds), then run the
    /// sound worker. Does not return under normal operation.
    pub async fn start(&mut self) {
        self.broker.connect().await;
        info!("[MQTT]: no consumer attached to the speech channel, its messages stay queued");
        self.sound_worker().await;
    }

    /// Wait for sound commands and dispatch them, forever
    pub async fn sound_worker(&mut self) {
        info!("[SOUND WORKER]: starting...");
        loop {
            let command = self.queues.sound().pop().await;
            self.handle(command);
        }
    }

    /// Dispatch every command already queued on the sound channel without
    /// waiting for new ones. Returns how many were taken.
    pub fn drain(&mut self) -> usize {
        let mut taken = 0;
        while let Some(command) = self.queues.sound().try_pop() {
            self.handle(command);
            taken += 1;
        }
        taken
    }

    fn handle(&mut self, command: Command) {
        info!("[SOUND WORKER]: took {} from sound queue...", command);
        if let Err(e) = self.dispatch(command) {
            error!("[SOUND WORKER]: {}", e);
        }
    }

    /// Act on one sound command
    pub fn dispatch(&mut self, command: Command) -> Result<()> {
        match command.cmd {
            CommandKind::Start => {
                let audio = command.audio.ok_or_else(|| {
                    Error::Common(sndmgr_common::Error::Format(
                        "start command without audio".to_string(),
                    ))
                })?;
                self.play(&audio)
            }
            CommandKind::Stop => self.stop(),
            CommandKind::Other(cmd) => {
                debug!("[SOUND WORKER]: ignoring cmd '{}'", cmd);
                Ok(())
            }
        }
    }

    fn play(&mut self, audio: &str) -> Result<()> {
        let path = self.sounds.resolve(audio)?;
        let session = self.player.spawn(&path)?;
        info!(
            "[SOUND WORKER]: started Player with pid@{}",
            pid_label(session.as_ref())
        );

        if let Some(previous) = self.session.replace(session) {
            // Dropping the handle leaves the previous process playing
            warn!(
                "[SOUND WORKER]: Player pid@{} ({}) is still running and no longer tracked",
                pid_label(previous.as_ref()),
                previous.sound().display()
            );
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let session = self.session.take().ok_or(Error::NoActivePlayer)?;
        info!(
            "[SOUND WORKER]: killed Player with pid@{}",
            pid_label(session.as_ref())
        );
        session.terminate();
        Ok(())
    }

    /// Terminate the recorded session and disconnect from the broker
    pub async fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            info!(
                "[SOUND WORKER]: stopping Player with pid@{}",
                pid_label(session.as_ref())
            );
            session.terminate();
        }
        self.broker.disconnect().await;
    }
}

fn pid_label(session: &dyn PlaybackSession) -> String {
    session
        .id()
        .map(|pid| pid.to_string())
        .unwrap_or_else(|| "?".to_string())
}
