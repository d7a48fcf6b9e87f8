use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use watch_core::{fingerprint, AlertTitles, CycleOutcome, NotificationMessage};
use watch_engine::{
    Clock, CycleError, CycleRunner, CycleTask, JsonStateStore, Notifier, VersionArchive,
    WatchConfig,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(watch_logging::initialize_for_tests);
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    sent: Arc<Mutex<Vec<NotificationMessage>>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<NotificationMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &NotificationMessage) -> bool {
        self.sent.lock().unwrap().push(message.clone());
        true
    }
}

fn stepping_clock() -> Clock {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
    let tick = Arc::new(AtomicI64::new(0));
    Arc::new(move || start + chrono::Duration::seconds(tick.fetch_add(1, Ordering::SeqCst)))
}

fn config(server: &MockServer, data_dir: &Path) -> WatchConfig {
    let mut config = WatchConfig::new(format!("{}/bando", server.uri()), data_dir);
    config.label = "Bulletin".to_string();
    config.fetch.backoffs = vec![Duration::ZERO; 3];
    config
}

fn runner(config: &WatchConfig, notifier: &RecordingNotifier) -> CycleRunner {
    CycleRunner::new(config)
        .with_notifier(notifier.clone())
        .with_clock(stepping_clock())
}

async fn serve(server: &MockServer, body: &str) {
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/bando"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

fn version_count(config: &WatchConfig) -> usize {
    VersionArchive::new(config.versions_dir(), stepping_clock())
        .list()
        .unwrap()
        .len()
}

#[tokio::test]
async fn first_run_same_body_then_changed_body() {
    init_logging();
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let config = config(&server, temp.path());
    let notifier = RecordingNotifier::default();
    let runner = runner(&config, &notifier);
    let store = JsonStateStore::in_dir(&config.data_dir);

    // First ever run: no prior fingerprint.
    serve(&server, "<main>Hello</main>").await;
    let outcome = runner.run_cycle().await.unwrap();
    assert!(matches!(
        outcome,
        CycleOutcome::Changed {
            first_acquisition: true,
            notified: true,
            ..
        }
    ));
    assert_eq!(version_count(&config), 1);
    assert_eq!(notifier.sent().len(), 1);
    assert!(notifier.sent()[0].title.contains("Monitor active"));
    let state = store.load();
    assert_eq!(state.content_fingerprint, Some(fingerprint("Hello")));
    assert_eq!(state.url.as_deref(), Some(config.url.as_str()));

    // Same body again: nothing archived, nothing sent.
    let outcome = runner.run_cycle().await.unwrap();
    assert_eq!(outcome, CycleOutcome::Unchanged);
    assert_eq!(version_count(&config), 1);
    assert_eq!(notifier.sent().len(), 1);

    // Body changes.
    serve(&server, "<main>Hello world</main>").await;
    let outcome = runner.run_cycle().await.unwrap();
    let CycleOutcome::Changed {
        version_id,
        first_acquisition,
        ..
    } = outcome
    else {
        panic!("expected a change, got {outcome:?}");
    };
    assert!(!first_acquisition);
    assert_eq!(version_count(&config), 2);
    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].title.contains("Change detected"));
    assert_eq!(sent[1].version_id, version_id);

    let state = store.load();
    assert_eq!(state.content_fingerprint, Some(fingerprint("Hello world")));
    assert_eq!(state.last_version_id, Some(version_id.clone()));
    let archived_dir = config.versions_dir().join(version_id.as_str());
    let archived = fs::read_to_string(archived_dir.join("content.txt")).unwrap();
    assert_eq!(archived, "Hello world");
}

#[tokio::test]
async fn not_modified_updates_validators_only() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bando"))
        .and(header("If-None-Match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304).insert_header("ETag", "\"v2\""))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bando"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"v1\"")
                .set_body_raw("<main>Hello</main>", "text/html"),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let config = config(&server, temp.path());
    let notifier = RecordingNotifier::default();
    let runner = runner(&config, &notifier);
    let store = JsonStateStore::in_dir(&config.data_dir);

    runner.run_cycle().await.unwrap();
    assert_eq!(store.load().validator_etag.as_deref(), Some("\"v1\""));

    let outcome = runner.run_cycle().await.unwrap();
    assert_eq!(outcome, CycleOutcome::NotModified);
    let state = store.load();
    assert_eq!(state.validator_etag.as_deref(), Some("\"v2\""));
    assert_eq!(state.content_fingerprint, Some(fingerprint("Hello")));
    assert_eq!(version_count(&config), 1);
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn fetch_failure_leaves_state_untouched() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let config = config(&server, temp.path());
    let notifier = RecordingNotifier::default();

    let err = runner(&config, &notifier).run_cycle().await.unwrap_err();

    assert!(matches!(err, CycleError::Network(_)));
    assert!(!JsonStateStore::in_dir(&config.data_dir).path().exists());
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn archive_failure_commits_nothing_and_sends_nothing() {
    init_logging();
    let server = MockServer::start().await;
    serve(&server, "<main>Hello</main>").await;

    let temp = TempDir::new().unwrap();
    let config = config(&server, temp.path());
    fs::write(config.versions_dir(), "not a directory").unwrap();
    let notifier = RecordingNotifier::default();

    let err = runner(&config, &notifier).run_cycle().await.unwrap_err();

    assert!(matches!(err, CycleError::Archive(_)));
    assert!(!JsonStateStore::in_dir(&config.data_dir).path().exists());
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn retention_applies_after_each_change() {
    init_logging();
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let mut config = config(&server, temp.path());
    config.keep_versions = 2;
    let notifier = RecordingNotifier::default();
    let runner = runner(&config, &notifier);

    for n in 0..4 {
        serve(&server, &format!("<main>Edition {n}</main>")).await;
        runner.run_cycle().await.unwrap();
    }

    assert_eq!(version_count(&config), 2);
    assert_eq!(notifier.sent().len(), 4);
}

#[tokio::test]
async fn configured_titles_reach_the_notifier() {
    init_logging();
    let server = MockServer::start().await;
    serve(&server, "<main>Bando 41</main>").await;
    let temp = TempDir::new().unwrap();
    let mut config = config(&server, temp.path());
    config.label = "IUSS Unife".to_string();
    config.titles = AlertTitles {
        first_acquisition: "Monitor attivo".to_string(),
        ..AlertTitles::default()
    };
    let notifier = RecordingNotifier::default();

    runner(&config, &notifier).run_cycle().await.unwrap();

    assert_eq!(notifier.sent()[0].title, "✅ <b>IUSS Unife – Monitor attivo</b>");
}
