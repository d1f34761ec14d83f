//! Optional semantic-insight service client. Enrichment calls it best-effort:
//! a failure or timeout means the record simply carries no insight text.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use leadscope_common::{HuntError, SizeCategory};

#[derive(Debug, Clone)]
pub struct InsightRequest {
    pub name: String,
    pub industry: Option<String>,
    pub size_category: SizeCategory,
}

#[async_trait]
pub trait InsightClient: Send + Sync {
    /// Return a short natural-language summary for an entity. An empty
    /// string means "nothing to say" and is treated the same as a failure.
    async fn insight(&self, request: &InsightRequest) -> Result<String, HuntError>;
}

/// No-op client for when no insight service is configured.
pub struct NoopInsightClient;

#[async_trait]
impl InsightClient for NoopInsightClient {
    async fn insight(&self, _request: &InsightRequest) -> Result<String, HuntError> {
        Ok(String::new())
    }
}

#[derive(Debug, Deserialize)]
struct InsightResponse {
    #[serde(default)]
    summary: String,
}

pub struct HttpInsightClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInsightClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        info!(base_url, "Using HttpInsightClient");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl InsightClient for HttpInsightClient {
    async fn insight(&self, request: &InsightRequest) -> Result<String, HuntError> {
        let body = serde_json::json!({
            "name": request.name,
            "industry": request.industry,
            "size": request.size_category.to_string(),
        });

        let resp = self
            .client
            .post(format!("{}/insight", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| HuntError::Enrichment(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HuntError::Enrichment(format!(
                "insight service returned status {status}"
            )));
        }

        let data: InsightResponse = resp
            .json()
            .await
            .map_err(|e| HuntError::Enrichment(e.to_string()))?;
        Ok(data.summary)
    }
}
