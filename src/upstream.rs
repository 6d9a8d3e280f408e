use axum::body::Bytes;
use axum::http::StatusCode;
use serde_json::Value;

use crate::error::GatewayError;
use crate::places::PlaceList;

const TARGET: &str = "upstream";

#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
    base_url: String,
}

impl Upstream {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        // add http:// if not present
        let base_url = if base_url.starts_with("http") {
            base_url.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", base_url.trim_end_matches('/'))
        };
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn login(&self, body: &Value) -> Result<(StatusCode, Bytes), GatewayError> {
        let response = self
            .client
            .post(format!("{}/api/auth/login", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|source| GatewayError::Transport { target: TARGET, source })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| GatewayError::Transport { target: TARGET, source })?;
        Ok((status, bytes))
    }

    pub async fn search_places(&self, keyword: Option<&str>) -> Result<PlaceList, GatewayError> {
        let url = format!("{}/api/places", self.base_url);
        let params: Vec<(&str, &str)> = keyword.map(|k| ("keyword", k)).into_iter().collect();
        let url = reqwest::Url::parse_with_params(&url, &params).map_err(|e| {
            GatewayError::InvalidResponse { source_name: TARGET, reason: e.to_string() }
        })?;
        self.get_places(url).await
    }

    pub async fn popular_places(&self) -> Result<PlaceList, GatewayError> {
        let url = format!("{}/api/places/popular", self.base_url);
        self.get_places(url).await
    }

    async fn get_places(&self, url: impl reqwest::IntoUrl) -> Result<PlaceList, GatewayError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| GatewayError::Transport { target: TARGET, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Provider {
                status,
                message: format!("backend responded with {status}"),
            });
        }

        response.json::<PlaceList>().await.map_err(|e| GatewayError::InvalidResponse {
            source_name: TARGET,
            reason: e.to_string(),
        })
    }
}
