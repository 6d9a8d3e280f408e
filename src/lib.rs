pub mod budget;
pub mod cache;
pub mod clock;
pub mod config;
pub mod directions;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod kakao;
pub mod logging;
pub mod maintenance;
pub mod metrics;
pub mod models;
pub mod places;
pub mod rate_limit;
pub mod state;
pub mod upstream;

pub use cache::ExpiringCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::GatewayError;
pub use rate_limit::{Policy, PolicyConfig, RateThrottle, ThrottleConfig};
