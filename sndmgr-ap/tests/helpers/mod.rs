//! Test helpers for sndmgr-ap integration tests
//!
//! - FakePlayer: records spawned sessions and terminations instead of
//!   starting processes
//! - test_manager: PlaybackManager wired to a FakePlayer and an
//!   unconnected BrokerClient

#![allow(dead_code)]

use sndmgr_ap::broker::BrokerClient;
use sndmgr_ap::playback::{PlaybackManager, PlaybackSession, Player, SoundLibrary};
use sndmgr_ap::queue::ChannelQueues;
use sndmgr_ap::Result;
use sndmgr_common::config::BrokerConfig;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Sound directory used by [`test_manager`]
pub const SOUND_DIR: &str = "/srv/sndmgr-test/sounds";

/// What the fake player saw
#[derive(Debug, Default)]
pub struct PlayerLog {
    /// Sound paths in spawn order
    pub spawned: Vec<PathBuf>,
    /// Session ids in termination order
    pub terminated: Vec<u32>,
}

/// [`Player`] that records instead of spawning processes.
///
/// Session ids are 1000, 1001, ... in spawn order.
#[derive(Debug, Clone, Default)]
pub struct FakePlayer {
    log: Arc<Mutex<PlayerLog>>,
}

impl FakePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawned(&self) -> Vec<PathBuf> {
        self.log.lock().unwrap().spawned.clone()
    }

    pub fn terminated(&self) -> Vec<u32> {
        self.log.lock().unwrap().terminated.clone()
    }

    /// Id the n-th spawned session received (0-based)
    pub fn session_id(n: usize) -> u32 {
        1000 + n as u32
    }
}

impl Player for FakePlayer {
    fn spawn(&self, sound: &Path) -> Result<Box<dyn PlaybackSession>> {
        let mut log = self.log.lock().unwrap();
        let id = Self::session_id(log.spawned.len());
        log.spawned.push(sound.to_path_buf());
        Ok(Box::new(FakeSession {
            id,
            sound: sound.to_path_buf(),
            log: Arc::clone(&self.log),
        }))
    }
}

#[derive(Debug)]
struct FakeSession {
    id: u32,
    sound: PathBuf,
    log: Arc<Mutex<PlayerLog>>,
}

impl PlaybackSession for FakeSession {
    fn id(&self) -> Option<u32> {
        Some(self.id)
    }

    fn sound(&self) -> &Path {
        &self.sound
    }

    fn terminate(self: Box<Self>) {
        self.log.lock().unwrap().terminated.push(self.id);
    }
}

/// Path the manager resolves for `name`
pub fn sound_path(name: &str) -> PathBuf {
    Path::new(SOUND_DIR).join(format!("{}.wav", name))
}

/// Manager + fake player sharing fresh queues; the broker is never connected
pub fn test_manager() -> (PlaybackManager, FakePlayer) {
    let queues = Arc::new(ChannelQueues::new());
    let broker = Arc::new(BrokerClient::new(BrokerConfig::default(), queues));
    let player = FakePlayer::new();
    let manager = PlaybackManager::new(
        broker,
        SoundLibrary::new(PathBuf::from(SOUND_DIR), "wav"),
        Arc::new(player.clone()),
    );
    (manager, player)
}
