pub mod error;
pub mod types;

pub use error::{RegistryError, Result};
pub use types::{CompanyRow, CompanySearchInput, SearchResponse};

use std::time::Duration;

use tracing::info;

pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RegistryClient {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(String::from),
        }
    }

    /// Search registered companies by industry and/or region.
    pub async fn search_companies(
        &self,
        industry: Option<&str>,
        region: Option<&str>,
        limit: u32,
    ) -> Result<Vec<CompanyRow>> {
        self.search(CompanySearchInput {
            industry: industry.map(String::from),
            region: region.map(String::from),
            government_vendors_only: false,
            limit,
        })
        .await
    }

    /// List companies registered as government vendors, optionally scoped to
    /// a region.
    pub async fn government_vendors(
        &self,
        region: Option<&str>,
        limit: u32,
    ) -> Result<Vec<CompanyRow>> {
        self.search(CompanySearchInput {
            industry: None,
            region: region.map(String::from),
            government_vendors_only: true,
            limit,
        })
        .await
    }

    async fn search(&self, input: CompanySearchInput) -> Result<Vec<CompanyRow>> {
        let url = format!("{}/companies/search", self.base_url);

        let mut req = self.client.post(&url).json(&input);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RegistryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let data: SearchResponse = resp.json().await?;
        info!(
            count = data.companies.len(),
            total = data.total,
            "Registry search complete"
        );
        Ok(data.companies)
    }
}
