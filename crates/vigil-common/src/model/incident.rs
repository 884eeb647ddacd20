//! Incident records

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Identified;
use crate::error::{Result, VigilError};

/// Progress of an incident investigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    #[default]
    Investigating,
    Identified,
    Monitoring,
    Resolved,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Investigating => "investigating",
            IncidentStatus::Identified => "identified",
            IncidentStatus::Monitoring => "monitoring",
            IncidentStatus::Resolved => "resolved",
        }
    }
}

impl Display for IncidentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IncidentStatus {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "investigating" => Ok(IncidentStatus::Investigating),
            "identified" => Ok(IncidentStatus::Identified),
            "monitoring" => Ok(IncidentStatus::Monitoring),
            "resolved" => Ok(IncidentStatus::Resolved),
            _ => Err(VigilError::UnknownIncidentStatus(s.to_string())),
        }
    }
}

/// An incident affecting one or more monitored services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: IncidentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Incident {
    pub fn new(id: impl Into<String>, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: IncidentStatus::Investigating,
            message: None,
            services: Vec::new(),
            created_at,
            updated_at: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == IncidentStatus::Resolved
    }
}

impl Identified for Incident {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Order incidents newest first by creation time.
pub fn sort_newest_first(incidents: &mut [Incident]) {
    incidents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
