//! Sound playback: sound file resolution, player sessions and the worker

pub mod manager;
pub mod player;
pub mod sounds;

pub use manager::{PlaybackManager, PlaybackState};
pub use player::{PlaybackSession, Player, ProcessPlayer};
pub use sounds::SoundLibrary;
