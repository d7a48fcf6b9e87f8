//! Watch engine: fetching, extraction, archival, notification and the
//! scheduling loop that executes the core's effects.
mod archive;
mod config;
mod cycle;
mod decode;
mod extract;
mod fetch;
mod notify;
mod persist;
mod scheduler;
mod state_store;
mod text;
mod types;

pub use archive::{ArchiveError, PruneReport, VersionArchive, MARKUP_FILENAME, TEXT_FILENAME};
pub use config::{WatchConfig, DEFAULT_INTERVAL_SECS, DEFAULT_KEEP_VERSIONS};
pub use cycle::{CycleError, CycleRunner, CycleTask};
pub use decode::{decode_body, DecodedBody};
pub use extract::{ExtractedContent, Extractor, MainContentExtractor, MAIN_CONTENT_SELECTORS};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use notify::{Notifier, TelegramNotifier, TelegramSettings};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use scheduler::Scheduler;
pub use state_store::{JsonStateStore, STATE_FILENAME};
pub use text::visible_text;
pub use types::{system_clock, Clock, FailureKind, FetchError, FetchResult, FetchStatus};
