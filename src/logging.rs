// Logging setup - tracing events rendered by tracing-subscriber

use tracing_subscriber::EnvFilter;

pub fn init(level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("{level},hyper=warn,reqwest=warn"))?,
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init()
}
