use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::enums::{AlertStatus, AlertType};

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("Longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("Confidence {0} outside [0.0, 1.0]")]
    ConfidenceOutOfRange(f64),
}

/// A geographic point, validated at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(ValidationError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Link suitable for embedding in a notification message.
    pub fn maps_url(&self) -> String {
        format!("https://maps.google.com/?q={},{}", self.lat, self.lng)
    }
}

/// A persisted distress event and its resolution state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Option<Uuid>,
    pub alert_type: AlertType,
    pub confidence: f64,
    pub status: AlertStatus,
    pub location: Option<GeoPoint>,
    pub snapshot_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub triggered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Fields supplied by the caller when creating an alert.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub user_id: Uuid,
    pub session_id: Option<Uuid>,
    pub alert_type: AlertType,
    pub confidence: f64,
    pub location: Option<GeoPoint>,
    pub snapshot_url: Option<String>,
}

impl NewAlert {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange(self.confidence));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_point_accepts_valid_coordinates() {
        assert!(GeoPoint::new(48.8566, 2.3522).is_ok());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
        assert!(GeoPoint::new(90.0, -180.0).is_ok());
    }

    #[test]
    fn geo_point_rejects_out_of_range() {
        assert_eq!(
            GeoPoint::new(90.5, 0.0),
            Err(ValidationError::LatitudeOutOfRange(90.5))
        );
        assert_eq!(
            GeoPoint::new(0.0, -180.1),
            Err(ValidationError::LongitudeOutOfRange(-180.1))
        );
    }

    #[test]
    fn maps_url_embeds_coordinates() {
        let point = GeoPoint::new(48.85, 2.35).unwrap();
        assert_eq!(point.maps_url(), "https://maps.google.com/?q=48.85,2.35");
    }

    #[test]
    fn new_alert_rejects_confidence_out_of_range() {
        let mut alert = NewAlert {
            user_id: Uuid::new_v4(),
            session_id: None,
            alert_type: AlertType::Panic,
            confidence: 1.2,
            location: None,
            snapshot_url: None,
        };
        assert_eq!(
            alert.validate(),
            Err(ValidationError::ConfidenceOutOfRange(1.2))
        );

        alert.confidence = 0.8;
        assert!(alert.validate().is_ok());
    }
}
