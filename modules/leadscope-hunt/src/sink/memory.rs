//! In-memory sink for offline runs and tests. Same upsert semantics as the
//! Postgres sink, minus the network.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use leadscope_common::{
    CanonicalRecord, DerivedAttributes, EnrichedRecord, HuntError, ScoredRecord,
};

use super::{natural_key, BatchReport, RecordSink};

#[derive(Debug, Clone)]
pub struct StoredRow {
    pub canonical: CanonicalRecord,
    pub derived: Option<DerivedAttributes>,
    pub priority_score: Option<u8>,
    pub requires_priority_handling: bool,
}

#[derive(Default)]
pub struct MemorySink {
    rows: Mutex<BTreeMap<(String, String), StoredRow>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one stored row, for assertions.
    pub fn get(&self, name: &str, city: &str) -> Option<StoredRow> {
        self.rows
            .lock()
            .expect("sink lock poisoned")
            .get(&(name.to_string(), city.to_string()))
            .cloned()
    }

    /// Snapshot of all stored rows, in key order.
    pub fn all(&self) -> Vec<StoredRow> {
        self.rows
            .lock()
            .expect("sink lock poisoned")
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn upsert_candidates(
        &self,
        records: &[CanonicalRecord],
    ) -> Result<BatchReport, HuntError> {
        let mut rows = self.rows.lock().expect("sink lock poisoned");
        let mut report = BatchReport::default();
        for record in records {
            let key = natural_key(record);
            match rows.get_mut(&key) {
                Some(row) => row.canonical.absorb_record(record),
                None => {
                    rows.insert(
                        key,
                        StoredRow {
                            canonical: record.clone(),
                            derived: None,
                            priority_score: None,
                            requires_priority_handling: false,
                        },
                    );
                }
            }
            report.stored += 1;
        }
        Ok(report)
    }

    async fn fetch_unenriched(&self, limit: u32) -> Result<Vec<CanonicalRecord>, HuntError> {
        let rows = self.rows.lock().expect("sink lock poisoned");
        Ok(rows
            .values()
            .filter(|row| row.derived.is_none())
            .take(limit as usize)
            .map(|row| row.canonical.clone())
            .collect())
    }

    async fn store_enriched(&self, records: &[EnrichedRecord]) -> Result<BatchReport, HuntError> {
        let mut rows = self.rows.lock().expect("sink lock poisoned");
        let mut report = BatchReport::default();
        for enriched in records {
            let key = natural_key(&enriched.record);
            match rows.get_mut(&key) {
                Some(row) => {
                    row.derived = Some(enriched.derived.clone());
                    report.stored += 1;
                }
                None => report.failed += 1,
            }
        }
        Ok(report)
    }

    async fn fetch_unscored(&self, limit: u32) -> Result<Vec<EnrichedRecord>, HuntError> {
        let rows = self.rows.lock().expect("sink lock poisoned");
        Ok(rows
            .values()
            .filter(|row| row.derived.is_some() && row.priority_score.is_none())
            .take(limit as usize)
            .map(|row| EnrichedRecord {
                record: row.canonical.clone(),
                derived: row.derived.clone().expect("filtered on is_some"),
            })
            .collect())
    }

    async fn store_scored(&self, records: &[ScoredRecord]) -> Result<BatchReport, HuntError> {
        let mut rows = self.rows.lock().expect("sink lock poisoned");
        let mut report = BatchReport::default();
        for scored in records {
            let key = natural_key(&scored.enriched.record);
            match rows.get_mut(&key) {
                Some(row) => {
                    row.priority_score = Some(scored.priority_score);
                    row.requires_priority_handling = scored.requires_priority_handling;
                    report.stored += 1;
                }
                None => report.failed += 1,
            }
        }
        Ok(report)
    }

    async fn count(&self) -> Result<u64, HuntError> {
        Ok(self.rows.lock().expect("sink lock poisoned").len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscope_common::CandidateRecord;

    fn canonical(name: &str, city: &str) -> CanonicalRecord {
        let mut c = CandidateRecord::new(name, "test");
        c.city = Some(city.to_string());
        CanonicalRecord::from(c)
    }

    #[tokio::test]
    async fn upsert_merges_on_key_conflict() {
        let sink = MemorySink::new();

        let mut first = canonical("Acme", "Austin");
        first.employee_count = Some(30);
        let mut second = canonical("Acme", "Austin");
        second.employee_count = Some(50);
        second.website = Some("https://acme.example.com".to_string());

        sink.upsert_candidates(&[first]).await.unwrap();
        sink.upsert_candidates(&[second]).await.unwrap();

        assert_eq!(sink.count().await.unwrap(), 1);
        let row = sink.get("Acme", "Austin").unwrap();
        assert_eq!(row.canonical.employee_count, Some(50));
        assert!(row.canonical.website.is_some());
    }

    #[tokio::test]
    async fn enrichment_pages_drain_to_empty() {
        let sink = MemorySink::new();
        let records: Vec<CanonicalRecord> = (0..5)
            .map(|i| canonical(&format!("Entity {i}"), "Austin"))
            .collect();
        sink.upsert_candidates(&records).await.unwrap();

        let page = sink.fetch_unenriched(3).await.unwrap();
        assert_eq!(page.len(), 3);

        // Nothing is enriched yet, so paging again returns the same rows.
        let full = sink.fetch_unenriched(100).await.unwrap();
        assert_eq!(full.len(), 5);
    }

    #[tokio::test]
    async fn store_enriched_against_missing_row_counts_failure() {
        let sink = MemorySink::new();
        let ghost = EnrichedRecord {
            record: canonical("Ghost", "Nowhere"),
            derived: crate::testing::test_derived(),
        };
        let report = sink.store_enriched(&[ghost]).await.unwrap();
        assert_eq!(report.stored, 0);
        assert_eq!(report.failed, 1);
    }
}
