use std::time::Duration;

use tokio_util::sync::CancellationToken;
use watch_logging::{watch_error, watch_info};

use crate::CycleTask;

/// Runs one cycle immediately, then one per interval until shutdown.
///
/// Cycles never overlap and are never interrupted: the shutdown token is only
/// observed while sleeping between cycles. A failed cycle is logged and
/// followed by the recovery pause on top of the regular interval.
pub struct Scheduler<T> {
    task: T,
    interval: Duration,
    recovery_pause: Duration,
}

impl<T: CycleTask> Scheduler<T> {
    pub fn new(task: T, interval: Duration, recovery_pause: Duration) -> Self {
        Self {
            task,
            interval,
            recovery_pause,
        }
    }

    /// Returns the number of cycles that were run.
    pub async fn run(&self, shutdown: CancellationToken) -> u64 {
        watch_info!(
            "Watcher started; checking every {}s",
            self.interval.as_secs_f64()
        );

        let mut cycles = 0u64;
        while !shutdown.is_cancelled() {
            cycles += 1;
            watch_logging::set_cycle(cycles);

            let wait = match self.task.run_cycle().await {
                Ok(_) => self.interval,
                Err(err) => {
                    watch_error!(
                        "Cycle failed: {}; retrying in {}s",
                        err,
                        (self.recovery_pause + self.interval).as_secs_f64()
                    );
                    self.recovery_pause + self.interval
                }
            };

            if sleep_or_shutdown(wait, &shutdown).await {
                break;
            }
        }

        watch_info!("Shutdown requested; stopped after {} cycles", cycles);
        cycles
    }
}

/// True when shutdown was requested before `wait` elapsed.
async fn sleep_or_shutdown(wait: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => true,
        _ = tokio::time::sleep(wait) => false,
    }
}
