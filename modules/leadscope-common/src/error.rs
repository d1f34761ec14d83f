use thiserror::Error;

#[derive(Error, Debug)]
pub enum HuntError {
    #[error("Source unavailable ({hunter}): {reason}")]
    SourceUnavailable { hunter: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Enrichment error: {0}")]
    Enrichment(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl HuntError {
    pub fn source_unavailable(hunter: &str, reason: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable {
            hunter: hunter.to_string(),
            reason: reason.to_string(),
        }
    }
}
