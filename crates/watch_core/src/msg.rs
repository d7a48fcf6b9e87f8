use crate::{Validators, VersionId, WatchState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Scheduler started a cycle with the state freshly loaded from disk.
    CycleStarted { state: WatchState, checked_at: i64 },
    /// Server answered 304; only validators may have changed.
    NotModified { validators: Validators },
    /// Server answered 2xx and the main content was extracted.
    ContentFetched {
        text: String,
        markup: String,
        validators: Validators,
    },
    /// The pending snapshot was written to the archive.
    VersionArchived { version_id: VersionId },
    /// Notifier finished; `delivered` is false when every attempt failed.
    NotificationSent { delivered: bool },
    /// A stage failed and the cycle is abandoned without touching state.
    CycleFailed { reason: String },
}
