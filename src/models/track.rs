use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Location sample reported by the tracked device. Has no server id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackUpdate {
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
}

impl TrackUpdate {
    pub fn now(at: Coordinate) -> Self {
        Self {
            latitude: at.latitude,
            longitude: at.longitude,
            recorded_at: Utc::now(),
        }
    }
}
