//! Side-effecting collaborators injected into the monitor

use std::sync::Arc;

use async_trait::async_trait;
use vigil_common::{MaintenanceStatus, MaintenanceWindow, NotificationKind};

/// Persists a maintenance record's status field.
///
/// Must tolerate redundant calls with the same status.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn persist_status(&self, window_id: &str, status: MaintenanceStatus)
    -> anyhow::Result<()>;
}

/// Dispatches an outbound alert describing a transition
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, window: &MaintenanceWindow, kind: NotificationKind)
    -> anyhow::Result<()>;
}

/// Supplies the current list of maintenance windows to the scheduler
#[async_trait]
pub trait WindowSource: Send + Sync {
    async fn list_windows(&self) -> anyhow::Result<Vec<MaintenanceWindow>>;
}

/// Invoked once per evaluation in which at least one window changed status
pub type AdvanceCallback = Arc<dyn Fn() + Send + Sync>;
