use std::collections::VecDeque;

use thiserror::Error;
use watch_core::{update, AlertTitles, CycleOutcome, Effect, Msg, Watcher};
use watch_logging::{watch_debug, watch_error, watch_info, watch_warn};

use crate::{
    system_clock, ArchiveError, Clock, Extractor, FetchError, FetchStatus, Fetcher,
    JsonStateStore, MainContentExtractor, Notifier, ReqwestFetcher, TelegramNotifier,
    VersionArchive, WatchConfig,
};

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Network(#[from] FetchError),
    #[error("archive failed: {0}")]
    Archive(#[from] ArchiveError),
    #[error("cycle ended without an outcome")]
    Incomplete,
}

/// One unit of scheduled work.
#[async_trait::async_trait]
pub trait CycleTask: Send + Sync {
    async fn run_cycle(&self) -> Result<CycleOutcome, CycleError>;
}

/// Executes the core's effects against real IO:
/// load state -> fetch -> extract -> detect -> archive + prune -> persist -> notify.
pub struct CycleRunner {
    url: String,
    label: String,
    titles: AlertTitles,
    keep_versions: usize,
    fetcher: Box<dyn Fetcher>,
    extractor: Box<dyn Extractor>,
    notifier: Box<dyn Notifier>,
    store: JsonStateStore,
    archive: VersionArchive,
    clock: Clock,
}

impl CycleRunner {
    pub fn new(config: &WatchConfig) -> Self {
        let clock = system_clock();
        Self {
            url: config.url.clone(),
            label: config.label.clone(),
            titles: config.titles.clone(),
            keep_versions: config.keep_versions,
            fetcher: Box::new(ReqwestFetcher::new(config.fetch.clone())),
            extractor: Box::new(MainContentExtractor::new()),
            notifier: Box::new(TelegramNotifier::new(config.telegram.clone())),
            store: JsonStateStore::in_dir(config.state_dir()),
            archive: VersionArchive::new(config.versions_dir(), clock.clone()),
            clock,
        }
    }

    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.archive = VersionArchive::new(self.archive.root().to_path_buf(), clock.clone());
        self.clock = clock;
        self
    }

    async fn execute(&self, effect: Effect) -> Result<Option<Msg>, CycleError> {
        match effect {
            Effect::Fetch { url, validators } => {
                let result = self.fetcher.fetch(&url, &validators).await?;
                match result.status {
                    FetchStatus::NotModified => Ok(Some(Msg::NotModified {
                        validators: result.validators,
                    })),
                    FetchStatus::Fetched => {
                        let content = self.extractor.extract(&result.body);
                        if content.matched_selector.is_none() {
                            watch_warn!("No main content element found; using the page body");
                        }
                        Ok(Some(Msg::ContentFetched {
                            text: content.normalized_text,
                            markup: content.normalized_markup,
                            validators: result.validators,
                        }))
                    }
                }
            }
            Effect::ArchiveVersion { text, markup } => {
                let version_id = self.archive.save(&text, &markup)?;
                watch_info!(
                    "Archived version {} in {:?}",
                    version_id,
                    self.archive.version_dir(&version_id)
                );
                match self.archive.prune(self.keep_versions) {
                    Ok(report) if !report.failed.is_empty() => watch_warn!(
                        "Pruning left {} stale versions behind",
                        report.failed.len()
                    ),
                    Ok(_) => {}
                    Err(err) => watch_warn!("Pruning skipped: {}", err),
                }
                Ok(Some(Msg::VersionArchived { version_id }))
            }
            Effect::PersistState(state) => {
                if let Err(err) = self.store.save(&state) {
                    watch_error!("Failed to persist state to {:?}: {}", self.store.path(), err);
                }
                Ok(None)
            }
            Effect::Notify(message) => {
                let delivered = self.notifier.send(&message).await;
                Ok(Some(Msg::NotificationSent { delivered }))
            }
        }
    }
}

#[async_trait::async_trait]
impl CycleTask for CycleRunner {
    async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        let state = self.store.load();
        let checked_at = (self.clock)().timestamp();
        let (mut watcher, effects) = update(
            Watcher::new(&self.url, &self.label).with_titles(self.titles.clone()),
            Msg::CycleStarted { state, checked_at },
        );

        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            let msg = match self.execute(effect).await {
                Ok(Some(msg)) => msg,
                Ok(None) => continue,
                Err(err) => {
                    let reason = err.to_string();
                    let (abandoned, _) = update(watcher, Msg::CycleFailed { reason });
                    watch_debug!(
                        "Cycle abandoned in phase {:?}; last committed version {:?}",
                        abandoned.phase(),
                        abandoned.state().last_version_id
                    );
                    return Err(err);
                }
            };
            let (next, effects) = update(watcher, msg);
            watcher = next;
            queue.extend(effects);
        }

        let outcome = watcher.outcome().cloned().ok_or(CycleError::Incomplete)?;
        match &outcome {
            CycleOutcome::NotModified => watch_info!("No change (304 Not Modified)"),
            CycleOutcome::Unchanged => watch_info!("No change in the main content"),
            CycleOutcome::Changed {
                version_id,
                first_acquisition,
                notified,
            } => watch_info!(
                "{} archived as {}; notified: {}",
                if *first_acquisition {
                    "First acquisition"
                } else {
                    "Change"
                },
                version_id,
                notified
            ),
        }
        Ok(outcome)
    }
}
