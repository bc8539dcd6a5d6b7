// src/upstream/client.rs
use async_trait::async_trait;
use metrics::counter;
use serde_json::Value;
use std::time::Duration;

use super::{MealApi, Params};
use crate::error::UpstreamError;

/// reqwest-backed NEIS hub client. Injects `KEY` and `Type=json` on every call.
#[derive(Clone)]
pub struct NeisClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NeisClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, UpstreamError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("school-meal-proxy/", env!("CARGO_PKG_VERSION")));
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder.build().map_err(UpstreamError::transport)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn get_json(&self, resource: &str, params: &Params) -> Result<Value, UpstreamError> {
        let mut query: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 2);
        query.push(("KEY", self.api_key.as_str()));
        query.push(("Type", "json"));
        query.extend(params.iter().map(|(k, v)| (*k, v.as_str())));

        let resp = self
            .http
            .get(format!("{}/{}", self.base_url, resource))
            .query(&query)
            .send()
            .await
            .map_err(UpstreamError::transport)?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(UpstreamError::transport)?;
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: serde_json::from_slice(&bytes).ok(),
            });
        }
        serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MealApi for NeisClient {
    async fn fetch(&self, resource: &str, params: &Params) -> Result<Value, UpstreamError> {
        counter!("upstream_requests_total", "resource" => resource.to_string()).increment(1);
        let result = self.get_json(resource, params).await;
        if let Err(e) = &result {
            counter!("upstream_errors_total", "resource" => resource.to_string()).increment(1);
            tracing::debug!(resource, error = %e, "upstream call failed");
        }
        result
    }
}
