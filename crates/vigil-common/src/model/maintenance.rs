//! Maintenance window records

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Identified;
use crate::error::{Result, VigilError};

/// Lifecycle status of a maintenance window.
///
/// Variants are ordered: a window only ever moves forward through them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
}

impl MaintenanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceStatus::Scheduled => "scheduled",
            MaintenanceStatus::InProgress => "in_progress",
            MaintenanceStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MaintenanceStatus::Completed)
    }
}

impl Display for MaintenanceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MaintenanceStatus {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "scheduled" => Ok(MaintenanceStatus::Scheduled),
            "in_progress" => Ok(MaintenanceStatus::InProgress),
            "completed" => Ok(MaintenanceStatus::Completed),
            _ => Err(VigilError::UnknownMaintenanceStatus(s.to_string())),
        }
    }
}

/// Which outbound alert is being sent for a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Start,
    End,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Start => "start",
            NotificationKind::End => "end",
        }
    }
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(NotificationKind::Start),
            "end" => Ok(NotificationKind::End),
            _ => Err(VigilError::UnknownNotificationKind(s.to_string())),
        }
    }
}

/// A planned, time-boxed maintenance activity.
///
/// Created externally with status `scheduled`; only the maintenance monitor
/// advances its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub status: MaintenanceStatus,
    /// Identifiers of the services affected by this window
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
}

impl MaintenanceWindow {
    /// Create a scheduled window, rejecting an empty id or an inverted time range.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self> {
        let window = Self {
            id: id.into(),
            title: title.into(),
            description: None,
            start_time,
            end_time,
            status: MaintenanceStatus::Scheduled,
            services: Vec::new(),
        };
        window.validate()?;
        Ok(window)
    }

    pub fn with_status(mut self, status: MaintenanceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_services(mut self, services: Vec<String>) -> Self {
        self.services = services;
        self
    }

    /// Check the record invariants: a non-empty id and `start_time < end_time`.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(VigilError::IllegalArgument(
                "maintenance window id must not be empty".to_string(),
            ));
        }
        if self.start_time >= self.end_time {
            return Err(VigilError::InvalidTimeRange {
                id: self.id.clone(),
                start: self.start_time.to_rfc3339(),
                end: self.end_time.to_rfc3339(),
            });
        }
        Ok(())
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_time
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    /// Whether `now` falls inside `[start_time, end_time]`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_time && now <= self.end_time
    }

    /// The status this window should have at `now`, ignoring what was persisted
    pub fn expected_status(&self, now: DateTime<Utc>) -> MaintenanceStatus {
        if self.has_ended(now) {
            MaintenanceStatus::Completed
        } else if self.has_started(now) {
            MaintenanceStatus::InProgress
        } else {
            MaintenanceStatus::Scheduled
        }
    }
}

impl Identified for MaintenanceWindow {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            MaintenanceStatus::Scheduled,
            MaintenanceStatus::InProgress,
            MaintenanceStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<MaintenanceStatus>().unwrap(), status);
        }
        assert!("paused".parse::<MaintenanceStatus>().is_err());
    }

    #[test]
    fn test_status_ordering_is_forward_only() {
        assert!(MaintenanceStatus::Scheduled < MaintenanceStatus::InProgress);
        assert!(MaintenanceStatus::InProgress < MaintenanceStatus::Completed);
        assert!(MaintenanceStatus::Completed.is_terminal());
        assert!(!MaintenanceStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_status_serde_uses_snake_case() {
        let json = serde_json::to_string(&MaintenanceStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let kind: NotificationKind = serde_json::from_str("\"end\"").unwrap();
        assert_eq!(kind, NotificationKind::End);
    }

    #[test]
    fn test_new_rejects_inverted_range() {
        let err = MaintenanceWindow::new("mw-1", "DB upgrade", base(), base()).unwrap_err();
        assert!(matches!(err, VigilError::InvalidTimeRange { .. }));

        let err = MaintenanceWindow::new(" ", "x", base(), base() + Duration::hours(1))
            .unwrap_err();
        assert!(matches!(err, VigilError::IllegalArgument(_)));
    }

    #[test]
    fn test_expected_status() {
        let window =
            MaintenanceWindow::new("mw-1", "DB upgrade", base(), base() + Duration::hours(1))
                .unwrap();

        assert_eq!(
            window.expected_status(base() - Duration::seconds(1)),
            MaintenanceStatus::Scheduled
        );
        assert_eq!(window.expected_status(base()), MaintenanceStatus::InProgress);
        assert!(window.is_active(base() + Duration::hours(1)));
        assert_eq!(
            window.expected_status(base() + Duration::hours(1)),
            MaintenanceStatus::Completed
        );
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{
            "id": "mw-9",
            "title": "Network cutover",
            "start_time": "2024-06-01T12:00:00Z",
            "end_time": "2024-06-01T13:00:00Z"
        }"#;
        let window: MaintenanceWindow = serde_json::from_str(json).unwrap();
        assert_eq!(window.status, MaintenanceStatus::Scheduled);
        assert!(window.services.is_empty());
        assert!(window.description.is_none());
        assert_eq!(window.id(), "mw-9");
    }
}
