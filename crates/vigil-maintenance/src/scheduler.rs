//! Periodic driver for the maintenance monitor
//!
//! Runs one evaluation immediately and then one per poll interval. Cycles
//! never overlap; a tick missed while a cycle runs is delayed, not burst.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use vigil_common::{BackgroundTask, Clock};

use crate::effects::WindowSource;
use crate::monitor::{MaintenanceMonitor, panic_message};

/// Default time between two evaluations
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl SchedulerConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

pub struct MaintenanceScheduler;

impl MaintenanceScheduler {
    /// Start the evaluation loop on the current runtime.
    pub fn spawn(
        monitor: Arc<MaintenanceMonitor>,
        source: Arc<dyn WindowSource>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> SchedulerHandle {
        let wake = Arc::new(Notify::new());
        let trigger = wake.clone();

        let task = BackgroundTask::spawn("maintenance-scheduler", move |signal| async move {
            let mut ticker = tokio::time::interval(config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = signal.cancelled() => break,
                    _ = ticker.tick() => {}
                    _ = wake.notified() => {
                        debug!("Immediate maintenance evaluation requested");
                    }
                }
                run_cycle(&monitor, source.as_ref(), clock.as_ref()).await;
            }
        });

        SchedulerHandle { task, trigger }
    }
}

async fn run_cycle(monitor: &MaintenanceMonitor, source: &dyn WindowSource, clock: &dyn Clock) {
    let windows = match AssertUnwindSafe(source.list_windows()).catch_unwind().await {
        Ok(Ok(windows)) => windows,
        Ok(Err(e)) => {
            warn!("Skipping maintenance evaluation, failed to list windows: {:#}", e);
            return;
        }
        Err(panic) => {
            warn!(
                "Skipping maintenance evaluation, window source panicked: {}",
                panic_message(panic.as_ref())
            );
            return;
        }
    };
    let report = monitor.evaluate(&windows, clock.now()).await;
    if !report.is_clean() {
        debug!(
            "Maintenance evaluation finished with {} isolated failures",
            report.failures.len()
        );
    }
}

/// Owner handle of a running [`MaintenanceScheduler`]
pub struct SchedulerHandle {
    task: BackgroundTask,
    trigger: Arc<Notify>,
}

impl SchedulerHandle {
    /// Request an extra evaluation as soon as the current one (if any) finishes
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop and wait for an in-flight evaluation to complete
    pub async fn shutdown(self) {
        self.task.shutdown().await;
    }
}
