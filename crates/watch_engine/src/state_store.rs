use std::fs;
use std::io;
use std::path::PathBuf;

use watch_core::WatchState;
use watch_logging::{watch_debug, watch_warn};

use crate::persist::{AtomicFileWriter, PersistError};

pub const STATE_FILENAME: &str = "state.json";

/// The watcher's single persisted record, stored as pretty JSON.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    dir: PathBuf,
    filename: String,
}

impl JsonStateStore {
    pub fn new(dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            filename: filename.into(),
        }
    }

    /// Store at `{dir}/state.json`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, STATE_FILENAME)
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }

    /// Missing, unreadable or corrupted state is a cold start, never an error.
    pub fn load(&self) -> WatchState {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                watch_debug!("No state file at {:?}; starting empty", path);
                return WatchState::default();
            }
            Err(err) => {
                watch_warn!("Failed to read state from {:?}: {}; starting empty", path, err);
                return WatchState::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(err) => {
                watch_warn!("Corrupted state in {:?}: {}; starting empty", path, err);
                WatchState::default()
            }
        }
    }

    pub fn save(&self, state: &WatchState) -> Result<PathBuf, PersistError> {
        let content = serde_json::to_string_pretty(state)?;
        AtomicFileWriter::new(self.dir.clone()).write(&self.filename, &content)
    }
}
