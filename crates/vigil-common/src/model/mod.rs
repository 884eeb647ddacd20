//! Domain records shared by the cache, the monitor, and the HTTP collaborators

pub mod incident;
pub mod maintenance;

pub use incident::{Incident, IncidentStatus, sort_newest_first};
pub use maintenance::{MaintenanceStatus, MaintenanceWindow, NotificationKind};

/// A record addressable by an opaque string identifier.
///
/// Collection caches use this to answer point lookups from an already
/// fetched collection.
pub trait Identified {
    fn id(&self) -> &str;
}
