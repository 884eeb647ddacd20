//! Maintenance window lifecycle monitor
//!
//! Each evaluation walks the supplied windows and, per window, in order:
//! 1. persists `in_progress` once the start time has been reached
//! 2. sends the start notification once that transition is persisted
//! 3. persists `completed` once the end time has been reached
//! 4. sends the end notification once that transition is persisted
//!
//! Status only moves forward. A failed persist blocks further attempts of the
//! same transition until its cooldown elapses; a failed notification is simply
//! retried on the next evaluation. Failures never leak across windows.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vigil_common::{MaintenanceStatus, MaintenanceWindow, NotificationKind};

use crate::effects::{AdvanceCallback, Notifier, StatusStore};
use crate::error::MonitorError;
use crate::guard::{CooldownPolicy, GuardBook, GuardState, TransitionKind};

/// Outcome of a single [`MaintenanceMonitor::evaluate`] call
#[derive(Debug, Clone, Default)]
pub struct EvaluationReport {
    /// Windows whose new status was persisted during this evaluation
    pub advanced: Vec<(String, MaintenanceStatus)>,
    /// Notifications delivered during this evaluation
    pub notified: Vec<(String, NotificationKind)>,
    /// Failures, each confined to one window
    pub failures: Vec<MonitorError>,
    /// Number of guards dropped because their window disappeared
    pub purged: usize,
}

impl EvaluationReport {
    pub fn has_advanced(&self) -> bool {
        !self.advanced.is_empty()
    }

    /// Whether every window was evaluated without a failure
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives maintenance windows through their lifecycle
pub struct MaintenanceMonitor {
    store: Arc<dyn StatusStore>,
    notifier: Arc<dyn Notifier>,
    cooldown: CooldownPolicy,
    on_advanced: Option<AdvanceCallback>,
    // Held for the whole evaluation so two evaluations never interleave
    guards: Mutex<GuardBook>,
}

impl MaintenanceMonitor {
    pub fn new(store: Arc<dyn StatusStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            cooldown: CooldownPolicy::default(),
            on_advanced: None,
            guards: Mutex::new(GuardBook::new()),
        }
    }

    pub fn with_cooldown(mut self, cooldown: CooldownPolicy) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Register a callback run after any evaluation that advanced a window
    pub fn on_advanced(mut self, callback: AdvanceCallback) -> Self {
        self.on_advanced = Some(callback);
        self
    }

    pub fn cooldown(&self) -> &CooldownPolicy {
        &self.cooldown
    }

    /// Evaluate `windows` against `now`.
    ///
    /// Guards of windows absent from `windows` are discarded, so the list must
    /// be the complete current set. Concurrent calls are serialized.
    pub async fn evaluate(
        &self,
        windows: &[MaintenanceWindow],
        now: DateTime<Utc>,
    ) -> EvaluationReport {
        let mut guards = self.guards.lock().await;
        let mut report = EvaluationReport::default();

        let live: HashSet<&str> = windows.iter().map(|w| w.id.as_str()).collect();
        report.purged = guards.retain_windows(&live);
        if report.purged > 0 {
            debug!("Purged {} guards of removed maintenance windows", report.purged);
        }

        for window in windows {
            if let Err(e) = window.validate() {
                warn!("Skipping maintenance window '{}': {}", window.id, e);
                report.failures.push(e.into());
                continue;
            }
            self.evaluate_window(&mut guards, window, now, &mut report)
                .await;
        }

        if report.has_advanced()
            && let Some(callback) = &self.on_advanced
            && let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| callback()))
        {
            warn!("Advance callback panicked: {}", panic_message(panic.as_ref()));
        }

        debug!(
            "Evaluated {} maintenance windows: {} advanced, {} notified, {} failed",
            windows.len(),
            report.advanced.len(),
            report.notified.len(),
            report.failures.len()
        );
        report
    }

    async fn evaluate_window(
        &self,
        guards: &mut GuardBook,
        window: &MaintenanceWindow,
        now: DateTime<Utc>,
        report: &mut EvaluationReport,
    ) {
        let id = window.id.as_str();

        // What this process already persisted wins over a stale input status
        let mut status = window.status;
        if guards.is_done(id, TransitionKind::Complete) {
            status = status.max(MaintenanceStatus::Completed);
        } else if guards.is_done(id, TransitionKind::Start) {
            status = status.max(MaintenanceStatus::InProgress);
        }

        if status == MaintenanceStatus::Scheduled
            && window.has_started(now)
            && self
                .try_transition(guards, window, TransitionKind::Start, now, report)
                .await
        {
            status = MaintenanceStatus::InProgress;
        }
        self.try_notify(guards, window, TransitionKind::Start, report)
            .await;

        if status == MaintenanceStatus::InProgress && window.has_ended(now) {
            self.try_transition(guards, window, TransitionKind::Complete, now, report)
                .await;
        }
        self.try_notify(guards, window, TransitionKind::Complete, report)
            .await;
    }

    /// Persist `kind` unless guarded, returning whether it was persisted now.
    async fn try_transition(
        &self,
        guards: &mut GuardBook,
        window: &MaintenanceWindow,
        kind: TransitionKind,
        now: DateTime<Utc>,
        report: &mut EvaluationReport,
    ) -> bool {
        if !guards.may_attempt(&window.id, kind, now) {
            return false;
        }

        let status = kind.target_status();
        let persisted = AssertUnwindSafe(self.store.persist_status(&window.id, status))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(anyhow::anyhow!(
                    "status store panicked: {}",
                    panic_message(panic.as_ref())
                ))
            });
        match persisted {
            Ok(()) => {
                guards.mark_done(&window.id, kind);
                info!(
                    "Maintenance window '{}' ({}) is now {}",
                    window.title, window.id, status
                );
                report.advanced.push((window.id.clone(), status));
                true
            }
            Err(e) => {
                let retry_at = guards.mark_failed(&window.id, kind, now, &self.cooldown);
                warn!(
                    "Failed to mark maintenance window {} as {}, retrying after {}: {:#}",
                    window.id, status, retry_at, e
                );
                report.failures.push(MonitorError::Persist {
                    window_id: window.id.clone(),
                    status,
                    message: format!("{:#}", e),
                });
                false
            }
        }
    }

    /// Send the notification for a persisted transition that has not been announced yet.
    async fn try_notify(
        &self,
        guards: &mut GuardBook,
        window: &MaintenanceWindow,
        transition: TransitionKind,
        report: &mut EvaluationReport,
    ) {
        let kind = transition.notification();
        if !guards.is_done(&window.id, transition) || guards.notification_sent(&window.id, kind) {
            return;
        }

        let notified = AssertUnwindSafe(self.notifier.notify(window, kind))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(anyhow::anyhow!(
                    "notifier panicked: {}",
                    panic_message(panic.as_ref())
                ))
            });
        match notified {
            Ok(()) => {
                guards.mark_notified(&window.id, kind);
                debug!("Sent '{}' notification for maintenance window {}", kind, window.id);
                report.notified.push((window.id.clone(), kind));
            }
            Err(e) => {
                warn!(
                    "Failed to send '{}' notification for maintenance window {}: {:#}",
                    kind, window.id, e
                );
                report.failures.push(MonitorError::Notify {
                    window_id: window.id.clone(),
                    kind,
                    message: format!("{:#}", e),
                });
            }
        }
    }

    /// Number of transition and notification guards currently held
    pub async fn guard_count(&self) -> usize {
        self.guards.lock().await.len()
    }

    pub async fn transition_state(
        &self,
        window_id: &str,
        kind: TransitionKind,
    ) -> Option<GuardState> {
        self.guards.lock().await.transition(window_id, kind)
    }

    pub async fn notification_sent(&self, window_id: &str, kind: NotificationKind) -> bool {
        self.guards.lock().await.notification_sent(window_id, kind)
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
