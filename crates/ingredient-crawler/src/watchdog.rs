//! Background loop that keeps closing the site's recurring overlay.
//!
//! The overlay can pop up at any time during the crawl, so a task runs next
//! to the main flow and re-runs the dismiss script on a coarse interval. It
//! only reads and clicks; it never navigates. It stops when the shared
//! "crawl finished" flag turns true.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::renderer::RenderContext;

/// Counters reported when the watchdog stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchdogStats {
    /// Dismiss attempts issued.
    pub attempts: u64,
    /// Attempts that actually closed an overlay.
    pub dismissed: u64,
}

/// Handle to the running watchdog task.
pub struct ModalWatchdog {
    handle: JoinHandle<WatchdogStats>,
}

impl ModalWatchdog {
    /// Start dismissing the overlay every `interval` until `finished` is set.
    pub fn spawn(
        ctx: Arc<dyn RenderContext>,
        script: String,
        interval: Duration,
        finished: Arc<AtomicBool>,
    ) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            tracing::debug!("modal watchdog started: interval={}ms", interval.as_millis());
            let mut stats = WatchdogStats::default();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if finished.load(Ordering::SeqCst) {
                    break;
                }
                stats.attempts += 1;
                // The overlay is usually absent; any failure just means "nothing to close".
                match ctx.execute_js(&script).await {
                    Ok(serde_json::Value::Bool(true)) => {
                        stats.dismissed += 1;
                        tracing::debug!("modal watchdog closed an overlay");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::trace!("modal watchdog: {e}"),
                }
            }

            tracing::debug!(
                "modal watchdog stopped: attempts={} dismissed={}",
                stats.attempts,
                stats.dismissed
            );
            stats
        });

        Self { handle }
    }

    /// Wait for the task to observe the finished flag and exit.
    pub async fn join(self) -> WatchdogStats {
        match self.handle.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!("modal watchdog task failed: {e}");
                WatchdogStats::default()
            }
        }
    }
}
