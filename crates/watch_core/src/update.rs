use crate::{
    fingerprint, has_changed, AlertTitles, Effect, Fingerprint, Msg, Validators, VersionId,
    WatchState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    NotModified,
    Unchanged,
    Changed {
        version_id: VersionId,
        first_acquisition: bool,
        notified: bool,
    },
}

/// Content that differs from the stored fingerprint and is waiting for the
/// archive write to succeed before it may be committed to state.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingChange {
    fingerprint: Fingerprint,
    validators: Validators,
    first_acquisition: bool,
}

/// Cycle driver state: one watched URL plus the persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watcher {
    url: String,
    label: String,
    titles: AlertTitles,
    phase: Phase,
    state: WatchState,
    checked_at: i64,
    pending: Option<PendingChange>,
    outcome: Option<CycleOutcome>,
}

impl Watcher {
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
            titles: AlertTitles::default(),
            phase: Phase::Idle,
            state: WatchState::default(),
            checked_at: 0,
            pending: None,
            outcome: None,
        }
    }

    pub fn with_titles(mut self, titles: AlertTitles) -> Self {
        self.titles = titles;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Result of the last cycle that ran to completion; `None` after a failure.
    pub fn outcome(&self) -> Option<&CycleOutcome> {
        self.outcome.as_ref()
    }

    fn finish(&mut self, outcome: CycleOutcome) {
        self.phase = Phase::Idle;
        self.pending = None;
        self.outcome = Some(outcome);
    }

    fn record_check(&mut self, validators: Validators) {
        self.state.apply_validators(validators);
        self.state.last_checked_at = Some(self.checked_at);
    }
}

/// Pure update function: applies a message to the watcher and returns the
/// effects the engine must execute, in order.
pub fn update(mut watcher: Watcher, msg: Msg) -> (Watcher, Vec<Effect>) {
    if watcher.phase == Phase::Idle && !matches!(msg, Msg::CycleStarted { .. }) {
        return (watcher, Vec::new());
    }

    let effects = match msg {
        Msg::CycleStarted { state, checked_at } => {
            if watcher.phase == Phase::Running {
                return (watcher, Vec::new());
            }
            watcher.phase = Phase::Running;
            watcher.state = state;
            watcher.checked_at = checked_at;
            watcher.pending = None;
            watcher.outcome = None;
            vec![Effect::Fetch {
                url: watcher.url.clone(),
                validators: watcher.state.validators(),
            }]
        }
        Msg::NotModified { validators } => {
            watcher.record_check(validators);
            watcher.finish(CycleOutcome::NotModified);
            vec![Effect::PersistState(watcher.state.clone())]
        }
        Msg::ContentFetched {
            text,
            markup,
            validators,
        } => {
            let current = fingerprint(&text);
            let previous = watcher.state.content_fingerprint.as_ref();
            if !has_changed(previous, &current) {
                watcher.record_check(validators);
                watcher.finish(CycleOutcome::Unchanged);
                vec![Effect::PersistState(watcher.state.clone())]
            } else {
                watcher.pending = Some(PendingChange {
                    first_acquisition: previous.is_none(),
                    fingerprint: current,
                    validators,
                });
                vec![Effect::ArchiveVersion { text, markup }]
            }
        }
        Msg::VersionArchived { version_id } => match watcher.pending.take() {
            Some(pending) => {
                watcher.record_check(pending.validators);
                watcher.state.content_fingerprint = Some(pending.fingerprint);
                watcher.state.url = Some(watcher.url.clone());
                watcher.state.last_version_id = Some(version_id.clone());

                let message = if pending.first_acquisition {
                    watcher.titles.first_acquisition(
                        &watcher.label,
                        &watcher.url,
                        version_id.clone(),
                    )
                } else {
                    watcher
                        .titles
                        .change_detected(&watcher.label, &watcher.url, version_id.clone())
                };
                watcher.outcome = Some(CycleOutcome::Changed {
                    version_id,
                    first_acquisition: pending.first_acquisition,
                    notified: false,
                });
                vec![
                    Effect::PersistState(watcher.state.clone()),
                    Effect::Notify(message),
                ]
            }
            None => Vec::new(),
        },
        Msg::NotificationSent { delivered } => {
            if let Some(CycleOutcome::Changed { notified, .. }) = watcher.outcome.as_mut() {
                *notified = delivered;
            }
            watcher.phase = Phase::Idle;
            Vec::new()
        }
        Msg::CycleFailed { .. } => {
            watcher.phase = Phase::Idle;
            watcher.pending = None;
            watcher.outcome = None;
            Vec::new()
        }
    };

    (watcher, effects)
}
