//! Vigil Client - HTTP collaborators
//!
//! - `RecordStoreClient`: generic list/get/update over a REST record store,
//!   with typed incident and maintenance collection views
//! - `WebhookNotifier` and `LogNotifier`: maintenance notification dispatch

pub mod config;
pub mod error;
pub mod notifier;
pub mod store;

pub use config::{RecordStoreConfig, WebhookConfig};
pub use error::{ClientError, Result};
pub use notifier::{LogNotifier, WebhookNotifier, notification_content};
pub use store::{IncidentCollection, MaintenanceCollection, RecordStoreClient};
