use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::error::GatewayError;
use crate::extract::ClientIp;
use crate::metrics::{EXTERNAL_CALLS, REQUEST_TOTAL, THROTTLED};
use crate::rate_limit::Policy;
use crate::state::AppState;

// every attempt counts against "ip:email", a successful login clears it
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    Json(body): Json<Value>,
) -> Result<Response, GatewayError> {
    REQUEST_TOTAL.inc();

    let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
    let identity = format!("{ip}:{email}");

    if state.throttle.check_and_consume(Policy::LoginAttempt, &identity) {
        THROTTLED.with_label_values(&[Policy::LoginAttempt.as_str()]).inc();
        return Err(GatewayError::RateLimited { policy: Policy::LoginAttempt });
    }

    EXTERNAL_CALLS.with_label_values(&["login"]).inc();
    let (status, bytes) = state.upstream.login(&body).await?;

    if status.is_success() {
        state.throttle.reset(Policy::LoginAttempt, &identity);
        info!(identity = %identity, "login succeeded, attempts reset");
    }

    Ok((status, [(header::CONTENT_TYPE, "application/json")], bytes).into_response())
}
