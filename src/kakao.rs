use axum::http::StatusCode;
use reqwest::Url;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::directions::Route;
use crate::error::GatewayError;
use crate::models::NearbyQuery;

const TARGET: &str = "kakao";
// culture facilities
const CATEGORY_CODE: &str = "CT1";
const PAGE_SIZE: u64 = 15;
const MAX_PAGES: u64 = 3;

#[derive(Debug, Clone)]
pub struct KakaoClient {
    client: reqwest::Client,
    api_key: String,
    mobility_url: String,
    local_url: String,
}

impl KakaoClient {
    pub fn new(
        client: reqwest::Client,
        api_key: impl Into<String>,
        mobility_url: impl Into<String>,
        local_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            mobility_url: mobility_url.into(),
            local_url: local_url.into(),
        }
    }

    pub async fn directions(&self, route: &Route) -> Result<Value, GatewayError> {
        let mut params = vec![
            ("priority", "RECOMMEND".to_string()),
            ("car_fuel", "GASOLINE".to_string()),
            ("car_hipass", "false".to_string()),
            ("origin", route.origin.lng_lat()),
            ("destination", route.destination.lng_lat()),
        ];
        if !route.waypoints.is_empty() {
            let waypoints: Vec<String> = route.waypoints.iter().map(|wp| wp.lng_lat()).collect();
            params.push(("waypoints", waypoints.join("|")));
        }

        let url = parse_url(&self.mobility_url, &params)?;
        self.get_json(url).await
    }

    // merges up to three result pages
    pub async fn nearby_culture_places(&self, query: &NearbyQuery) -> Result<Value, GatewayError> {
        let first = self.category_page(query, 1).await?;
        let meta = first.get("meta").cloned().unwrap_or(Value::Null);
        let total_count = meta.get("total_count").and_then(Value::as_u64).unwrap_or(0);
        let pageable_count = meta.get("pageable_count").and_then(Value::as_u64).unwrap_or(0);
        let is_end = meta.get("is_end").and_then(Value::as_bool).unwrap_or(true);
        info!(total_count, pageable_count, is_end, "nearby culture places first page");

        if is_end || pageable_count <= PAGE_SIZE {
            return Ok(first);
        }

        let mut documents = documents_of(&first);
        let max_pages = MAX_PAGES.min(pageable_count.div_ceil(PAGE_SIZE));
        for page in 2..=max_pages {
            let next = self.category_page(query, page).await?;
            documents.extend(documents_of(&next));
            let last = next
                .get("meta")
                .and_then(|m| m.get("is_end"))
                .and_then(Value::as_bool)
                .unwrap_or(true);
            if last {
                break;
            }
        }

        info!(count = documents.len(), "nearby culture places merged");
        Ok(json!({
            "meta": {
                "total_count": total_count,
                "pageable_count": pageable_count,
                "is_end": true,
            },
            "documents": documents,
        }))
    }

    async fn category_page(&self, query: &NearbyQuery, page: u64) -> Result<Value, GatewayError> {
        let params = [
            ("category_group_code", CATEGORY_CODE.to_string()),
            ("x", format!("{:.15}", query.lng)),
            ("y", format!("{:.15}", query.lat)),
            ("radius", query.radius.to_string()),
            ("size", PAGE_SIZE.to_string()),
            ("page", page.to_string()),
        ];
        let url = parse_url(&format!("{}/category.json", self.local_url), &params)?;
        self.get_json(url).await
    }

    async fn get_json(&self, url: Url) -> Result<Value, GatewayError> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("KakaoAK {}", self.api_key))
            .send()
            .await
            .map_err(|source| GatewayError::Transport { target: TARGET, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(status, &body));
        }

        response.json::<Value>().await.map_err(|e| GatewayError::InvalidResponse {
            source_name: TARGET,
            reason: e.to_string(),
        })
    }
}

fn parse_url(base: &str, params: &[(&str, String)]) -> Result<Url, GatewayError> {
    Url::parse_with_params(base, params).map_err(|e| GatewayError::Provider {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: format!("invalid provider url {base}: {e}"),
    })
}

fn documents_of(page: &Value) -> Vec<Value> {
    page.get("documents").and_then(Value::as_array).cloned().unwrap_or_default()
}

pub fn provider_error(status: StatusCode, body: &str) -> GatewayError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN if body.contains("ip mismatched") => {
            GatewayError::Provider {
                status: StatusCode::FORBIDDEN,
                message: "register the server IP in the Kakao API whitelist".into(),
            }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Provider {
            status: StatusCode::UNAUTHORIZED,
            message: "check the Kakao API key and its permissions".into(),
        },
        StatusCode::TOO_MANY_REQUESTS => GatewayError::Provider {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "Kakao API rate limit exceeded".into(),
        },
        other => {
            error!(status = %other, body, "kakao call failed");
            GatewayError::Provider { status: other, message: format!("provider call failed: {other}") }
        }
    }
}
