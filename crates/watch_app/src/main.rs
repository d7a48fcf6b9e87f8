mod config;

use std::path::Path;

use anyhow::Context;
use log::LevelFilter;
use tokio_util::sync::CancellationToken;
use watch_engine::{CycleRunner, Scheduler};
use watch_logging::{watch_info, watch_warn};

use crate::config::AppConfig;

const LOG_FILE: &str = "./watch.log";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    watch_logging::initialize(config.log_destination, LevelFilter::Info, Path::new(LOG_FILE));

    let watch = config.watch;
    watch_info!(
        "Watching {} ({}); data in {:?}, keeping {} versions",
        watch.url,
        watch.label,
        watch.data_dir,
        watch.keep_versions
    );
    if watch.telegram.token.is_none() || watch.telegram.chat_id.is_none() {
        watch_warn!("Telegram credentials missing; changes will be logged but not sent");
    }

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            watch_warn!("Could not listen for Ctrl-C: {}", err);
            return;
        }
        watch_info!("Ctrl-C received; stopping after the current cycle");
        on_signal.cancel();
    });

    let scheduler = Scheduler::new(
        CycleRunner::new(&watch),
        watch.interval,
        watch.recovery_pause,
    );
    scheduler.run(shutdown).await;
    Ok(())
}
