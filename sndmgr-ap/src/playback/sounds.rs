//! Sound name to file path resolution

use crate::error::{Error, Result};
use sndmgr_common::config::SoundConfig;
use std::path::{Component, Path, PathBuf};

/// Directory of playable sound files
#[derive(Debug, Clone)]
pub struct SoundLibrary {
    dir: PathBuf,
    extension: String,
}

impl SoundLibrary {
    /// `dir` must be absolute
    pub fn new(dir: PathBuf, extension: impl Into<String>) -> Self {
        Self {
            dir,
            extension: extension.into(),
        }
    }

    /// Build from configuration, anchoring relative (or absent) directories
    /// at the current working directory
    pub fn from_config(config: &SoundConfig) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let dir = match &config.dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => cwd.join(dir),
            None => cwd.join("sounds"),
        };
        Ok(Self::new(dir, config.extension.clone()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute path for a logical sound name: `<dir>/<name>.<extension>`.
    ///
    /// Sub-directories are allowed; absolute names and `..` are not.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let contained = !name.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if !contained {
            return Err(Error::InvalidSoundName(name.to_string()));
        }

        Ok(self.dir.join(format!("{}.{}", name, self.extension)))
    }
}
