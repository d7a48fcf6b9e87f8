use crate::{NotificationMessage, Validators, WatchState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Fetch { url: String, validators: Validators },
    ArchiveVersion { text: String, markup: String },
    PersistState(WatchState),
    Notify(NotificationMessage),
}
