use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per `(track, alert type)` repeat suppression
pub mod cooldown;

/// Background notification delivery
pub mod dispatch;

/// Fusion of zone, loitering and identity checks into alerts
pub mod engine;

/// Outbound notification seam
pub mod notify;

/// Alert persistence seam
pub mod store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    Stationary,
    RestrictedZone,
    UnknownPerson,
}

impl AlertType {
    /// Notification subject for the alert type
    ///
    pub fn subject(&self) -> &'static str {
        match self {
            AlertType::Stationary => "Stationary Person Alert",
            AlertType::RestrictedZone => "Restricted Zone Alert",
            AlertType::UnknownPerson => "Unknown Person Alert",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Stationary => "STATIONARY",
            AlertType::RestrictedZone => "RESTRICTED_ZONE",
            AlertType::UnknownPerson => "UNKNOWN_PERSON",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed alert event, immutable once created
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    camera_id: String,
    track_id: Option<u64>,
    alert_type: AlertType,
    description: String,
    created_at: DateTime<Utc>,
}

impl Alert {
    /// Creates the alert stamped with the current time
    ///
    pub fn new(
        camera_id: &str,
        track_id: Option<u64>,
        alert_type: AlertType,
        description: String,
    ) -> Self {
        Self::with_time(camera_id, track_id, alert_type, description, Utc::now())
    }

    pub fn with_time(
        camera_id: &str,
        track_id: Option<u64>,
        alert_type: AlertType,
        description: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            camera_id: camera_id.to_string(),
            track_id,
            alert_type,
            description,
            created_at,
        }
    }

    /// Restricted zone violation by the track
    ///
    pub fn restricted_zone(camera_id: &str, track_id: u64, zone: &str) -> Self {
        Self::new(
            camera_id,
            Some(track_id),
            AlertType::RestrictedZone,
            format!("Restricted Zone Violation ({}) - Track {}", zone, track_id),
        )
    }

    /// Loitering track
    ///
    pub fn stationary(camera_id: &str, track_id: u64) -> Self {
        Self::new(
            camera_id,
            Some(track_id),
            AlertType::Stationary,
            format!("Person Loitering - Track {}", track_id),
        )
    }

    /// Face of the track matches no known identity
    ///
    pub fn unknown_person(camera_id: &str, track_id: u64) -> Self {
        Self::new(
            camera_id,
            Some(track_id),
            AlertType::UnknownPerson,
            format!("Unknown Person - Track {}", track_id),
        )
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn track_id(&self) -> Option<u64> {
        self.track_id
    }

    pub fn alert_type(&self) -> AlertType {
        self.alert_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
