use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::budget::BudgetError;
use crate::models::ErrorBody;
use crate::rate_limit::Policy;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("too many {policy} requests, try again later")]
    RateLimited { policy: Policy },
    #[error("provider call budget exhausted: {0}")]
    Budget(#[from] BudgetError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} is disabled: no Kakao REST API key is configured")]
    Disabled(&'static str),
    #[error("{message}")]
    Provider { status: StatusCode, message: String },
    #[error("invalid response from {source_name}: {reason}")]
    InvalidResponse { source_name: &'static str, reason: String },
    #[error("request to {target} failed: {source}")]
    Transport {
        target: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } | Self::Budget(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Disabled(_) | Self::Transport { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Provider { status, .. } => *status,
            Self::InvalidResponse { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ErrorBody { message: self.to_string() })).into_response()
    }
}
