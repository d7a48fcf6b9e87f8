//! Watch core: pure cycle state machine, change detection and alert wording.
mod detect;
mod effect;
mod msg;
mod notification;
mod state;
mod update;

pub use detect::{fingerprint, has_changed, Fingerprint};
pub use effect::Effect;
pub use msg::Msg;
pub use notification::{escape_html, AlertTitles, NotificationMessage};
pub use state::{Validators, VersionId, WatchState};
pub use update::{update, CycleOutcome, Phase, Watcher};
