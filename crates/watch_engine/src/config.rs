use std::path::{Path, PathBuf};
use std::time::Duration;

use watch_core::AlertTitles;

use crate::{FetchSettings, TelegramSettings};

pub const DEFAULT_INTERVAL_SECS: u64 = 120;
pub const DEFAULT_KEEP_VERSIONS: usize = 5;
const DEFAULT_RECOVERY_PAUSE: Duration = Duration::from_secs(10);
const VERSIONS_DIRNAME: &str = "versions";

/// Immutable watcher configuration, built once at startup and shared by
/// reference with every component.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub url: String,
    /// Human name of the page used in alert titles.
    pub label: String,
    /// Alert headlines following the label.
    pub titles: AlertTitles,
    pub interval: Duration,
    /// Pause after a failed cycle before the interval timer resumes.
    pub recovery_pause: Duration,
    /// Newest versions retained by pruning; 0 keeps none.
    pub keep_versions: usize,
    pub data_dir: PathBuf,
    pub fetch: FetchSettings,
    pub telegram: TelegramSettings,
}

impl WatchConfig {
    pub fn new(url: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            label: "Watched page".to_string(),
            titles: AlertTitles::default(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            recovery_pause: DEFAULT_RECOVERY_PAUSE,
            keep_versions: DEFAULT_KEEP_VERSIONS,
            data_dir: data_dir.into(),
            fetch: FetchSettings::default(),
            telegram: TelegramSettings::default(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.data_dir.join(VERSIONS_DIRNAME)
    }
}
