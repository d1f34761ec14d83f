use std::env;

use crate::error::HuntError;

/// Pipeline configuration loaded from environment variables. Validated before
/// any phase starts; a bad config is the only fatal error in the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. When absent the run uses the in-memory
    /// sink (offline mode).
    pub database_url: Option<String>,

    // Registry API
    pub registry_api_url: String,
    pub registry_api_key: Option<String>,

    // Directory source
    pub directory_base_url: String,

    // Optional insight service
    pub insight_api_url: Option<String>,

    // Concurrency and pacing
    pub concurrency: usize,
    pub rate_limit_per_minute: u32,
    pub batch_size: usize,
    pub enrich_page_size: u32,
    /// Per-invocation cap on records a single hunter may return.
    pub max_records_per_hunt: usize,

    // Per-category target counts
    pub priority_target_count: u32,
    pub mandated_target_count: u32,
    pub industry_target_count: u32,
    pub general_sample_count: u32,

    /// Industries subject to regulatory mandates. Entities matching these are
    /// flagged for compliance tracking.
    pub mandated_industries: Vec<String>,

    /// Optional JSON file overriding the built-in classification table.
    pub classification_table_path: Option<String>,

    /// Geography restriction passed to hunters (e.g. "TX").
    pub region: Option<String>,
}

/// Industries tracked by default when LEADSCOPE_MANDATED_INDUSTRIES is unset.
const DEFAULT_MANDATED_INDUSTRIES: &[&str] = &[
    "defense",
    "aerospace",
    "healthcare",
    "pharmaceutical",
    "finance",
    "banking",
    "energy",
    "utilities",
    "aviation",
    "chemicals",
];

impl Config {
    /// Load configuration from environment variables and validate it.
    pub fn from_env() -> Result<Self, HuntError> {
        let mandated_industries = match env::var("LEADSCOPE_MANDATED_INDUSTRIES") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => DEFAULT_MANDATED_INDUSTRIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let config = Self {
            database_url: env::var("DATABASE_URL").ok(),
            registry_api_url: env::var("REGISTRY_API_URL")
                .unwrap_or_else(|_| "https://registry.example.com/api/v1".to_string()),
            registry_api_key: env::var("REGISTRY_API_KEY").ok(),
            directory_base_url: env::var("DIRECTORY_BASE_URL")
                .unwrap_or_else(|_| "https://directory.example.com/listings".to_string()),
            insight_api_url: env::var("INSIGHT_API_URL").ok(),
            concurrency: parse_env("LEADSCOPE_CONCURRENCY", 10)?,
            rate_limit_per_minute: parse_env("LEADSCOPE_RATE_LIMIT_PER_MINUTE", 100)?,
            batch_size: parse_env("LEADSCOPE_BATCH_SIZE", 50)?,
            enrich_page_size: parse_env("LEADSCOPE_ENRICH_PAGE_SIZE", 100)?,
            max_records_per_hunt: parse_env("LEADSCOPE_MAX_RECORDS_PER_HUNT", 100)?,
            priority_target_count: parse_env("LEADSCOPE_PRIORITY_TARGETS", 50)?,
            mandated_target_count: parse_env("LEADSCOPE_MANDATED_TARGETS", 40)?,
            industry_target_count: parse_env("LEADSCOPE_INDUSTRY_TARGETS", 40)?,
            general_sample_count: parse_env("LEADSCOPE_GENERAL_SAMPLES", 25)?,
            mandated_industries,
            classification_table_path: env::var("LEADSCOPE_CLASSIFICATION_TABLE").ok(),
            region: env::var("LEADSCOPE_REGION").ok(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HuntError> {
        if self.concurrency == 0 {
            return Err(HuntError::Config("concurrency must be > 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(HuntError::Config("batch size must be > 0".to_string()));
        }
        if self.enrich_page_size == 0 {
            return Err(HuntError::Config(
                "enrichment page size must be > 0".to_string(),
            ));
        }
        if self.max_records_per_hunt == 0 {
            return Err(HuntError::Config(
                "per-hunt record cap must be > 0".to_string(),
            ));
        }
        let counts = [
            self.priority_target_count,
            self.mandated_target_count,
            self.industry_target_count,
            self.general_sample_count,
        ];
        if counts.iter().any(|&c| c == 0) {
            return Err(HuntError::Config(
                "all per-category target counts must be > 0".to_string(),
            ));
        }
        if self.mandated_industries.is_empty() {
            return Err(HuntError::Config(
                "mandated industry list must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, HuntError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| HuntError::Config(format!("{key} must be a number, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}
