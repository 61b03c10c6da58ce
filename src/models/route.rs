use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::Coordinate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start_point: Coordinate,
    pub end_point: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub id: i64,
    /// Metres
    pub total_distance: f64,
    /// Seconds
    pub total_time: i64,
    #[serde(default)]
    pub path: Vec<Coordinate>,
}

impl RouteResponse {
    /// Travel time, `None` when the server sent a value out of range
    pub fn duration(&self) -> Option<Duration> {
        Duration::try_seconds(self.total_time)
    }

    pub fn start(&self) -> Option<Coordinate> {
        self.path.first().copied()
    }

    pub fn end(&self) -> Option<Coordinate> {
        self.path.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_helpers() {
        let route: RouteResponse = serde_json::from_value(json!({
            "id": 1,
            "total_distance": 1200.5,
            "total_time": 900,
            "path": [
                { "latitude": 1.0, "longitude": 2.0 },
                { "latitude": 3.0, "longitude": 4.0 }
            ]
        }))
        .unwrap();

        assert_eq!(route.duration(), Some(Duration::minutes(15)));
        assert_eq!(route.start(), Some(Coordinate::new(1.0, 2.0)));
        assert_eq!(route.end(), Some(Coordinate::new(3.0, 4.0)));
    }

    #[test]
    fn out_of_range_total_time_has_no_duration() {
        let route: RouteResponse = serde_json::from_value(json!({
            "id": 2,
            "total_distance": 0.0,
            "total_time": i64::MAX
        }))
        .unwrap();

        assert_eq!(route.duration(), None);
        assert!(route.path.is_empty());
        assert_eq!(route.start(), None);
    }

    #[test]
    fn request_wire_shape() {
        let request = RouteRequest {
            start_point: Coordinate::new(37.5, 127.0),
            end_point: Coordinate::new(37.6, 127.1),
        };
        let expected = json!({
            "start_point": { "latitude": 37.5, "longitude": 127.0 },
            "end_point": { "latitude": 37.6, "longitude": 127.1 }
        });

        assert_eq!(serde_json::to_value(&request).unwrap(), expected);
        assert_eq!(serde_json::from_value::<RouteRequest>(expected).unwrap(), request);
    }
}
