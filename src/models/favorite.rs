use serde::{Deserialize, Serialize};

use super::Coordinate;

/// Bookmarked place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteLocation {
    pub id: i64,
    pub loc_name: String,
    pub loc_info: LocationInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    #[serde(default)]
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationInfo {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteLocationRequest {
    pub loc_name: String,
    pub loc_info: LocationInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_location_info() {
        let favorite: FavoriteLocation = serde_json::from_value(json!({
            "id": 11,
            "loc_name": "clinic",
            "loc_info": { "address": "Seoul", "latitude": 37.55, "longitude": 126.99 }
        }))
        .unwrap();

        assert_eq!(favorite.loc_info.coordinate(), Coordinate::new(37.55, 126.99));
        assert_eq!(favorite.loc_info.address.as_deref(), Some("Seoul"));
    }

    #[test]
    fn request_wire_shape() {
        let request = FavoriteLocationRequest {
            loc_name: "park".into(),
            loc_info: LocationInfo {
                address: None,
                latitude: 35.1,
                longitude: 129.0,
            },
        };
        let expected = json!({
            "loc_name": "park",
            "loc_info": { "address": null, "latitude": 35.1, "longitude": 129.0 }
        });

        assert_eq!(serde_json::to_value(&request).unwrap(), expected);
        assert_eq!(
            serde_json::from_value::<FavoriteLocationRequest>(expected).unwrap(),
            request
        );
    }
}
