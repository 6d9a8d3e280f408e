use std::sync::Arc;

use crate::budget::UsageCounter;
use crate::clock::Clock;
use crate::config::Args;
use crate::directions::DirectionsService;
use crate::kakao::KakaoClient;
use crate::models::ApiUsage;
use crate::places::PlaceCache;
use crate::rate_limit::RateThrottle;
use crate::upstream::Upstream;
// app's shared state

#[derive(Debug)]
pub struct AppState {
    pub upstream: Upstream,
    pub kakao: Option<KakaoClient>,
    pub throttle: RateThrottle,
    pub places: PlaceCache,
    pub directions: DirectionsService,
    pub search_usage: UsageCounter,
}

impl AppState {
    pub fn new(args: &Args, clock: Arc<dyn Clock>) -> Self {
        let client = reqwest::Client::new();
        let kakao = args.kakao_key().map(|key| {
            KakaoClient::new(
                client.clone(),
                key,
                args.kakao_mobility_url.as_str(),
                args.kakao_local_url.as_str(),
            )
        });

        Self {
            upstream: Upstream::new(client, &args.upstream),
            directions: DirectionsService::new(kakao.clone(), args.directions(), clock.clone()),
            kakao,
            throttle: RateThrottle::new(args.throttle()).with_clock(clock.clone()),
            places: PlaceCache::new(args.place_cache(), clock.clone()),
            search_usage: UsageCounter::with_clock(clock),
        }
    }

    pub fn api_usage(&self) -> ApiUsage {
        ApiUsage {
            directions_today: self.directions.usage().today(),
            directions_total: self.directions.usage().total(),
            search_today: self.search_usage.today(),
            search_total: self.search_usage.total(),
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.places.len() + self.directions.cached()
    }
}
