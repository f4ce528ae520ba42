//! Playback sessions backed by an external player process
//!
//! A session plays one sound file over and over until it is terminated. Each
//! pass is a fresh child process of the configured player program; a
//! supervising task respawns it after every completed pass and kills the
//! current child when the session is terminated.

use crate::error::{Error, Result};
use sndmgr_common::config::PlayerConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Handle to one running playback session
pub trait PlaybackSession: Send + fmt::Debug {
    /// OS process id of the current player pass, if known.
    ///
    /// Changes every time the pass is respawned.
    fn id(&self) -> Option<u32>;

    /// Sound file being repeated
    fn sound(&self) -> &Path;

    /// Stop the session. Fire-and-forget: does not wait for the process.
    fn terminate(self: Box<Self>);
}

/// Starts playback sessions
pub trait Player: Send + Sync {
    fn spawn(&self, sound: &Path) -> Result<Box<dyn PlaybackSession>>;
}

/// [`Player`] running the configured external program
#[derive(Debug, Clone)]
pub struct ProcessPlayer {
    config: PlayerConfig,
}

impl ProcessPlayer {
    pub fn new(config: PlayerConfig) -> Self {
        Self { config }
    }

    fn command(&self, sound: &Path) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .arg(sound)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }

    fn spawn_child(&self, command: &mut Command) -> Result<Child> {
        command.spawn().map_err(|source| Error::PlayerSpawn {
            program: self.config.program.clone(),
            source,
        })
    }

    fn check_sound(sound: &Path) -> Result<()> {
        if sound.is_file() {
            Ok(())
        } else {
            Err(Error::SoundNotFound(sound.to_path_buf()))
        }
    }

    /// Play `sound` a single time and wait for the player to exit
    pub async fn play_once(&self, sound: &Path) -> Result<ExitStatus> {
        Self::check_sound(sound)?;
        let mut child = self.spawn_child(&mut self.command(sound))?;
        info!("[Player]: playing: {}...", sound.display());
        let status = child.wait().await?;
        info!("[Player]: done...");
        Ok(status)
    }
}

impl Player for ProcessPlayer {
    /// Must be called from within a tokio runtime
    fn spawn(&self, sound: &Path) -> Result<Box<dyn PlaybackSession>> {
        Self::check_sound(sound)?;

        let mut command = self.command(sound);
        let child = self.spawn_child(&mut command)?;
        let pid = Arc::new(AtomicU32::new(child.id().unwrap_or(NO_PID)));
        let stop = Arc::new(Notify::new());

        tokio::spawn(repeat_until_stopped(
            child,
            command,
            sound.to_path_buf(),
            Arc::clone(&pid),
            Arc::clone(&stop),
        ));

        Ok(Box::new(ProcessSession {
            pid,
            sound: sound.to_path_buf(),
            stop,
        }))
    }
}

/// Stored in place of a pid the OS did not report
const NO_PID: u32 = 0;

#[derive(Debug)]
struct ProcessSession {
    pid: Arc<AtomicU32>,
    sound: PathBuf,
    stop: Arc<Notify>,
}

impl PlaybackSession for ProcessSession {
    fn id(&self) -> Option<u32> {
        match self.pid.load(Ordering::Relaxed) {
            NO_PID => None,
            pid => Some(pid),
        }
    }

    fn sound(&self) -> &Path {
        &self.sound
    }

    fn terminate(self: Box<Self>) {
        // A stored permit covers the window where the supervisor is respawning
        self.stop.notify_one();
    }
}

/// Supervise one session: respawn after each clean pass, kill on stop.
///
/// A failing player (non-zero exit) ends the session instead of respawning.
async fn repeat_until_stopped(
    mut child: Child,
    mut command: Command,
    sound: PathBuf,
    pid: Arc<AtomicU32>,
    stop: Arc<Notify>,
) {
    loop {
        info!("[Player]: playing: {}...", sound.display());

        tokio::select! {
            status = child.wait() => match status {
                Ok(status) if status.success() => info!("[Player]: done..."),
                Ok(status) => {
                    error!("[Player]: player {} for {}, giving up", status, sound.display());
                    return;
                }
                Err(e) => {
                    error!("[Player]: lost track of player for {}: {}", sound.display(), e);
                    return;
                }
            },
            _ = stop.notified() => {
                if let Err(e) = child.kill().await {
                    warn!("[Player]: could not kill player for {}: {}", sound.display(), e);
                }
                info!("[Player]: stopped {}", sound.display());
                return;
            }
        }

        child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("[Player]: could not restart player for {}: {}", sound.display(), e);
                pid.store(NO_PID, Ordering::Relaxed);
                return;
            }
        };
        pid.store(child.id().unwrap_or(NO_PID), Ordering::Relaxed);
    }
}
