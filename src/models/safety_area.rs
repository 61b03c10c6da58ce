//! Safety zones the tracked user is expected to stay inside

use serde::{Deserialize, Serialize};

use super::Coordinate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyArea {
    pub id: i64,
    pub area_name: String,
    /// Outline vertices, in order
    pub area_coor: Vec<Coordinate>,
    /// Metres, for circular areas
    #[serde(default)]
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyAreaRequest {
    pub area_name: String,
    pub area_coor: Vec<Coordinate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

impl SafetyArea {
    pub fn to_request(&self) -> SafetyAreaRequest {
        SafetyAreaRequest {
            area_name: self.area_name.clone(),
            area_coor: self.area_coor.clone(),
            radius: self.radius,
        }
    }
}
