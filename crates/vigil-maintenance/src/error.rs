//! Monitor error types
//!
//! None of these are fatal to the monitor; they are collected per evaluation
//! in an [`EvaluationReport`](crate::EvaluationReport).

use vigil_common::{MaintenanceStatus, NotificationKind, VigilError};

/// A failure isolated to a single maintenance window
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MonitorError {
    #[error("rejected maintenance window: {0}")]
    InvalidWindow(#[from] VigilError),

    #[error("failed to persist status '{status}' for window {window_id}: {message}")]
    Persist {
        window_id: String,
        status: MaintenanceStatus,
        message: String,
    },

    #[error("failed to send '{kind}' notification for window {window_id}: {message}")]
    Notify {
        window_id: String,
        kind: NotificationKind,
        message: String,
    },
}

impl MonitorError {
    pub fn window_id(&self) -> Option<&str> {
        match self {
            MonitorError::InvalidWindow(VigilError::InvalidTimeRange { id, .. }) => Some(id),
            MonitorError::InvalidWindow(_) => None,
            MonitorError::Persist { window_id, .. } | MonitorError::Notify { window_id, .. } => {
                Some(window_id)
            }
        }
    }
}
