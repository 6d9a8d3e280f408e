use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct LatLng {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

// Directions request body; coordinates are validated by the directions service
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct DirectionsRequest {
    pub origin_lat: Option<f64>,
    pub origin_lng: Option<f64>,
    pub dest_lat: Option<f64>,
    pub dest_lng: Option<f64>,
    #[serde(default)]
    pub waypoints: Vec<LatLng>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DirectionsResponse {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub path: Vec<LatLng>,
    pub from_cache: bool,
    pub provider: String,
    pub transport_mode: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct SearchQuery {
    pub keyword: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct NearbyQuery {
    pub lng: f64,
    pub lat: f64,
    #[serde(default = "NearbyQuery::default_radius")]
    pub radius: u32,
}

impl NearbyQuery {
    fn default_radius() -> u32 {
        2000
    }
}

// API usage numbers for the admin dashboard
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiUsage {
    pub directions_today: u64,
    pub directions_total: u64,
    pub search_today: u64,
    pub search_total: u64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub message: String,
}
