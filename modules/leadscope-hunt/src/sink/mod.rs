//! Persistence sink. Batch upsert keyed on (name, city); the sink, not the
//! orchestrator, resolves cross-batch conflicts for the same key. Per-row
//! failures are reported, never silently swallowed.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use leadscope_common::{CanonicalRecord, EnrichedRecord, HuntError, ScoredRecord};

pub use memory::MemorySink;
pub use postgres::PostgresSink;

/// Outcome of one batch write. `failed` rows are counted toward the run's
/// error total; the rest of the batch still lands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub stored: u32,
    pub failed: u32,
}

#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Upsert canonical records by (name, city). A key collision merges with
    /// the stored row under the same field-wise policy the dedup engine uses.
    async fn upsert_candidates(&self, records: &[CanonicalRecord])
        -> Result<BatchReport, HuntError>;

    /// Page of records with no derived block yet.
    async fn fetch_unenriched(&self, limit: u32) -> Result<Vec<CanonicalRecord>, HuntError>;

    /// Attach derived blocks. Replaces any prior block atomically.
    async fn store_enriched(&self, records: &[EnrichedRecord]) -> Result<BatchReport, HuntError>;

    /// Page of enriched records with no priority score yet.
    async fn fetch_unscored(&self, limit: u32) -> Result<Vec<EnrichedRecord>, HuntError>;

    /// Attach priority scores.
    async fn store_scored(&self, records: &[ScoredRecord]) -> Result<BatchReport, HuntError>;

    async fn count(&self) -> Result<u64, HuntError>;
}

/// The sink's natural key.
pub(crate) fn natural_key(record: &CanonicalRecord) -> (String, String) {
    (
        record.name.clone(),
        record.city.clone().unwrap_or_default(),
    )
}
