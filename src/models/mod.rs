//! Wire records exchanged with the K-HIGH backend, plus the local user row.
//!
//! Field names are the backend's contract and must stay exactly as declared.

pub mod caretaker;
pub mod favorite;
pub mod route;
pub mod safety_area;
pub mod track;
pub mod user;

use serde::{Deserialize, Serialize};

pub use caretaker::{Caretaker, CaretakerRequest};
pub use favorite::{FavoriteLocation, FavoriteLocationRequest, LocationInfo};
pub use route::{RouteRequest, RouteResponse};
pub use safety_area::{SafetyArea, SafetyAreaRequest};
pub use track::TrackUpdate;
pub use user::{TokenResponse, UserEntity, UserProfile};

/// WGS84 point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}
