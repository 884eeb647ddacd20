//! Vigil Common - Shared types, traits, and utilities
//!
//! This crate provides the foundational types used across all Vigil components:
//! - Error types for model validation
//! - Maintenance window and incident records
//! - The `Identified` trait used by collection caches
//! - An injectable clock for deterministic time
//! - Shutdown signalling for background loops

pub mod clock;
pub mod error;
pub mod model;
pub mod task;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, VigilError};
pub use model::*;
pub use task::{BackgroundTask, ShutdownSignal};

/// Default collection name for incident records
pub const DEFAULT_INCIDENTS_COLLECTION: &str = "incidents";

/// Default collection name for maintenance records
pub const DEFAULT_MAINTENANCE_COLLECTION: &str = "maintenance";
