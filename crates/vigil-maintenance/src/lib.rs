//! Vigil Maintenance - maintenance window lifecycle monitor
//!
//! This crate provides:
//! - `MaintenanceMonitor`: advances windows through
//!   `scheduled -> in_progress -> completed` as wall-clock time passes,
//!   persisting each transition and notifying at most once per kind
//! - Guard bookkeeping with a retry cooldown for failed transitions
//! - `MaintenanceScheduler`: the cancellable periodic driver
//! - The `StatusStore`, `Notifier` and `WindowSource` seams to the outside world

pub mod effects;
pub mod error;
pub mod guard;
pub mod monitor;
pub mod scheduler;

pub use effects::{AdvanceCallback, Notifier, StatusStore, WindowSource};
pub use error::MonitorError;
pub use guard::{CooldownPolicy, GuardBook, GuardState, TransitionKind};
pub use monitor::{EvaluationReport, MaintenanceMonitor};
pub use scheduler::{MaintenanceScheduler, SchedulerConfig, SchedulerHandle};
