//! Periodic trigger for the poll cycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::pipeline::processor::PollCycle;
use crate::pipeline::types::CycleOutcome;

/// Spawn a background task that triggers `cycle` every `interval`.
///
/// The first tick fires immediately. Returns a `JoinHandle` and a shutdown
/// flag. Set the flag to stop polling.
pub fn spawn_poller(
    cycle: Arc<PollCycle>,
    interval: Duration,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "Poller started");

        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tick.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Poller shutting down");
                return;
            }

            // Outcomes are already logged by the cycle itself.
            if let CycleOutcome::Skipped = cycle.trigger().await {
                debug!("Timer tick overlapped a running cycle");
            }
        }
    });

    (handle, shutdown_flag)
}
