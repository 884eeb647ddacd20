//! Property tests: whatever the interleaving of time, failures and host
//! refreshes, a window's persisted status only moves forward and every
//! transition and notification happens at most once.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use proptest::prelude::*;
use vigil_common::{MaintenanceStatus, MaintenanceWindow, NotificationKind};
use vigil_maintenance::{MaintenanceMonitor, Notifier, StatusStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    Persisted(MaintenanceStatus),
    Notified(NotificationKind),
}

#[derive(Default)]
struct FlakyBackend {
    effects: Mutex<Vec<Effect>>,
    fail_persist: Mutex<bool>,
    fail_notify: Mutex<bool>,
}

#[async_trait]
impl StatusStore for FlakyBackend {
    async fn persist_status(&self, _: &str, status: MaintenanceStatus) -> anyhow::Result<()> {
        if *self.fail_persist.lock() {
            anyhow::bail!("persist failed");
        }
        self.effects.lock().push(Effect::Persisted(status));
        Ok(())
    }
}

#[async_trait]
impl Notifier for FlakyBackend {
    async fn notify(&self, _: &MaintenanceWindow, kind: NotificationKind) -> anyhow::Result<()> {
        if *self.fail_notify.lock() {
            anyhow::bail!("notify failed");
        }
        self.effects.lock().push(Effect::Notified(kind));
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Step {
    advance_secs: i64,
    fail_persist: bool,
    fail_notify: bool,
    host_refresh: bool,
}

fn step() -> impl Strategy<Value = Step> {
    (0i64..1_200, any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(advance_secs, fail_persist, fail_notify, host_refresh)| Step {
            advance_secs,
            fail_persist,
            fail_notify,
            host_refresh,
        },
    )
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

proptest! {
    #[test]
    fn status_only_moves_forward(
        start_secs in 0i64..3_600,
        length_secs in 1i64..7_200,
        steps in proptest::collection::vec(step(), 1..40),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let backend = Arc::new(FlakyBackend::default());
        let monitor = MaintenanceMonitor::new(backend.clone(), backend.clone());
        let start = t0() + chrono::Duration::seconds(start_secs);
        let mut window = MaintenanceWindow::new(
            "mw-prop",
            "Property window",
            start,
            start + chrono::Duration::seconds(length_secs),
        )
        .unwrap();

        let mut now = t0();
        for step in &steps {
            now += chrono::Duration::seconds(step.advance_secs);
            *backend.fail_persist.lock() = step.fail_persist;
            *backend.fail_notify.lock() = step.fail_notify;

            runtime.block_on(monitor.evaluate(std::slice::from_ref(&window), now));

            if step.host_refresh {
                let persisted = backend.effects.lock().iter().filter_map(|e| match e {
                    Effect::Persisted(status) => Some(*status),
                    Effect::Notified(_) => None,
                }).max();
                if let Some(status) = persisted {
                    window.status = status;
                }
            }
        }

        let effects = backend.effects.lock().clone();
        let persisted: Vec<_> = effects.iter().filter_map(|e| match e {
            Effect::Persisted(status) => Some(*status),
            Effect::Notified(_) => None,
        }).collect();
        prop_assert!(persisted.windows(2).all(|pair| pair[0] < pair[1]));
        prop_assert!(!persisted.contains(&MaintenanceStatus::Scheduled));

        for kind in [NotificationKind::Start, NotificationKind::End] {
            let sent = effects.iter().filter(|e| **e == Effect::Notified(kind)).count();
            prop_assert!(sent <= 1);
        }

        // A notification never precedes the transition it announces
        let position = |effect: Effect| effects.iter().position(|e| *e == effect);
        if let Some(notified) = position(Effect::Notified(NotificationKind::Start)) {
            let persisted = position(Effect::Persisted(MaintenanceStatus::InProgress));
            prop_assert!(persisted.is_some_and(|p| p < notified));
        }
        if let Some(notified) = position(Effect::Notified(NotificationKind::End)) {
            let persisted = position(Effect::Persisted(MaintenanceStatus::Completed));
            prop_assert!(persisted.is_some_and(|p| p < notified));
        }
    }
}
