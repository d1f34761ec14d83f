//! Collection strategies. Each hunter drives one kind of external source and
//! maps whatever it finds into [`CandidateRecord`]s with normalized contact
//! fields. Hunters share nothing; each owns its own session resources.

pub mod directory;
pub mod registry;
pub mod sample;

use async_trait::async_trait;
use typed_builder::TypedBuilder;

use leadscope_common::{CandidateRecord, HuntError};

pub use directory::DirectoryHunter;
pub use registry::RegistryHunter;
pub use sample::SampleHunter;

/// Source-specific query: an industry, a geography, or a general sample
/// count, depending on the strategy.
#[derive(Debug, Clone, TypedBuilder)]
pub struct HuntQuery {
    #[builder(default, setter(strip_option, into))]
    pub industry: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub region: Option<String>,
    /// For strategies without a live integration: how many records to
    /// generate.
    #[builder(default = 25)]
    pub sample_count: u32,
    /// Restrict to registered government vendors.
    #[builder(default = false)]
    pub government_only: bool,
}

#[async_trait]
pub trait Hunter: Send + Sync {
    /// Collect candidates for one query. An unreachable source returns
    /// `HuntError::SourceUnavailable`; the orchestrator decides whether to
    /// substitute flagged placeholder data. Hunters never fail on absent
    /// optional fields and cap their own output volume.
    async fn collect(&self, query: &HuntQuery) -> Result<Vec<CandidateRecord>, HuntError>;

    fn name(&self) -> &str;
}
