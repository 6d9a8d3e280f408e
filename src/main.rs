use clap::Parser; // for cli
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use culturemap_gateway::clock::SystemClock;
use culturemap_gateway::config::Args;
use culturemap_gateway::handlers::router;
use culturemap_gateway::state::AppState;
use culturemap_gateway::{logging, maintenance};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // parse cli arguments
    let args = Args::parse();
    logging::init(&args.log_level)?;

    let state = Arc::new(AppState::new(&args, Arc::new(SystemClock)));

    // spawn the sweeper
    let sweep_state = Arc::clone(&state);
    let sweep_every = Duration::from_secs(args.sweep_interval.max(1));
    tokio::spawn(async move {
        maintenance::sweeper(sweep_state, sweep_every).await;
    });

    let app = router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(port = args.port, "gateway running");
    info!(upstream = %args.upstream, "forwarding to planner backend");
    info!(
        login_limit = args.login_limit,
        login_window_secs = args.login_window,
        search_limit = args.search_limit,
        search_window_secs = args.search_window,
        "rate limits"
    );
    if args.kakao_key().is_none() {
        info!("no Kakao REST API key, directions and nearby search are disabled");
    }

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
