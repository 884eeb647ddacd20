//! Error types for Vigil domain records

/// Application-specific error types
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VigilError {
    #[error("invalid time range for '{id}': start {start} is not before end {end}")]
    InvalidTimeRange {
        id: String,
        start: String,
        end: String,
    },

    #[error("unknown maintenance status: {0}")]
    UnknownMaintenanceStatus(String),

    #[error("unknown incident status: {0}")]
    UnknownIncidentStatus(String),

    #[error("unknown notification kind: {0}")]
    UnknownNotificationKind(String),

    #[error("caused: {0}")]
    IllegalArgument(String),
}

pub type Result<T> = std::result::Result<T, VigilError>;
