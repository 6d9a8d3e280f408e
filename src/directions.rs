use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::budget::{BudgetConfig, CallBudget, UsageCounter};
use crate::cache::ExpiringCache;
use crate::clock::Clock;
use crate::error::GatewayError;
use crate::kakao::KakaoClient;
use crate::models::{DirectionsRequest, DirectionsResponse, LatLng};

pub const PROVIDER: &str = "kakao-mobility";
pub const TRANSPORT_MODE: &str = "CAR";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lng: f64,
}

impl Coord {
    pub fn lng_lat(&self) -> String {
        format!("{:.6},{:.6}", self.lng, self.lat)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub origin: Coord,
    pub destination: Coord,
    pub waypoints: Vec<Coord>,
}

impl TryFrom<&DirectionsRequest> for Route {
    type Error = GatewayError;

    fn try_from(req: &DirectionsRequest) -> Result<Self, Self::Error> {
        let (Some(origin_lat), Some(origin_lng), Some(dest_lat), Some(dest_lng)) =
            (req.origin_lat, req.origin_lng, req.dest_lat, req.dest_lng)
        else {
            return Err(GatewayError::BadRequest(
                "origin and destination coordinates are required".into(),
            ));
        };
        if origin_lat == dest_lat && origin_lng == dest_lng {
            return Err(GatewayError::BadRequest("origin and destination are the same".into()));
        }

        // incomplete waypoints are skipped
        let waypoints = req
            .waypoints
            .iter()
            .filter_map(|wp| Some(Coord { lat: wp.lat?, lng: wp.lng? }))
            .collect();

        Ok(Route {
            origin: Coord { lat: origin_lat, lng: origin_lng },
            destination: Coord { lat: dest_lat, lng: dest_lng },
            waypoints,
        })
    }
}

impl Route {
    // sha-256 of the normalized coordinates
    pub fn cache_key(&self) -> String {
        let mut key = format!("{}->{}", self.origin.lng_lat(), self.destination.lng_lat());
        if !self.waypoints.is_empty() {
            key.push_str("|wp=");
            for wp in &self.waypoints {
                key.push_str(&wp.lng_lat());
                key.push(';');
            }
        }
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

pub fn parse_route(body: &Value) -> Result<DirectionsResponse, GatewayError> {
    let first = body
        .get("routes")
        .and_then(Value::as_array)
        .and_then(|routes| routes.first())
        .ok_or_else(|| GatewayError::InvalidResponse {
            source_name: PROVIDER,
            reason: "no routes in response".into(),
        })?;

    let summary = first.get("summary");
    let number = |field: &str| {
        summary.and_then(|s| s.get(field)).and_then(Value::as_f64).unwrap_or(0.0)
    };

    Ok(DirectionsResponse {
        distance_meters: number("distance"),
        duration_seconds: number("duration"),
        path: extract_path(first),
        from_cache: false,
        provider: PROVIDER.to_string(),
        transport_mode: TRANSPORT_MODE.to_string(),
    })
}

// vertexes are flattened [lng1, lat1, lng2, lat2, ...]
fn extract_path(route: &Value) -> Vec<LatLng> {
    let roads = route
        .get("sections")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|section| section.get("roads").and_then(Value::as_array))
        .flatten();

    let mut path = Vec::new();
    for road in roads {
        let Some(vertexes) = road.get("vertexes").and_then(Value::as_array) else {
            continue;
        };
        for pair in vertexes.chunks_exact(2) {
            path.push(LatLng { lat: pair[1].as_f64(), lng: pair[0].as_f64() });
        }
    }
    path
}

#[derive(Debug, Clone, Copy)]
pub struct DirectionsConfig {
    pub cache_ttl: Duration,
    pub budget: BudgetConfig,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self { cache_ttl: Duration::from_secs(10 * 60), budget: BudgetConfig::default() }
    }
}

#[derive(Debug)]
pub struct DirectionsService {
    kakao: Option<KakaoClient>,
    cache: ExpiringCache<DirectionsResponse>,
    budget: CallBudget,
    usage: UsageCounter,
    cache_ttl: Duration,
}

impl DirectionsService {
    pub fn new(kakao: Option<KakaoClient>, config: DirectionsConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            kakao,
            cache: ExpiringCache::default().with_clock(clock.clone()),
            budget: CallBudget::with_clock(config.budget, clock.clone()),
            usage: UsageCounter::with_clock(clock),
            cache_ttl: config.cache_ttl,
        }
    }

    pub async fn car_directions(
        &self,
        req: &DirectionsRequest,
    ) -> Result<DirectionsResponse, GatewayError> {
        let Some(kakao) = &self.kakao else {
            return Err(GatewayError::Disabled("directions"));
        };
        let route = Route::try_from(req)?;

        let key = route.cache_key();
        if let Some(mut cached) = self.cache.get(&key) {
            debug!(key = %key, "directions cache hit");
            cached.from_cache = true;
            return Ok(cached);
        }

        self.budget.try_acquire()?;

        let body = kakao.directions(&route).await?;
        let parsed = parse_route(&body)?;
        self.cache.put(key, parsed.clone(), self.cache_ttl);
        self.usage.record();
        info!(
            distance = parsed.distance_meters,
            points = parsed.path.len(),
            "directions fetched from provider"
        );
        Ok(parsed)
    }

    pub fn usage(&self) -> &UsageCounter {
        &self.usage
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn sweep_expired(&self) -> usize {
        self.cache.sweep_expired()
    }
}
