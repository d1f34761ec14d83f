//! Deterministic fakes for campaign tests: no network, no browser, no
//! database. `cargo test` in seconds.

use async_trait::async_trait;
use chrono::Utc;

use leadscope_common::{
    CandidateRecord, ComplianceUrgency, DerivedAttributes, HuntError, SizeCategory,
};

use crate::hunters::{Hunter, HuntQuery};

/// A neutral derived block for sink-level tests.
pub fn test_derived() -> DerivedAttributes {
    DerivedAttributes {
        industry_category: "Other".to_string(),
        industry_code: 9999,
        size_category: SizeCategory::Unknown,
        revenue_estimate: None,
        contact_validity: 0.0,
        timezone: None,
        data_completeness: 10.0,
        engagement_potential: 52.0,
        compliance_urgency: ComplianceUrgency::None,
        insight: None,
        enriched_at: Utc::now(),
    }
}

/// Hunter that generates `per_query` candidates per call, named after the
/// query so batches from different queries never collide in dedup. Fails
/// with `SourceUnavailable` when the query's industry equals `fail_marker`.
pub struct TestHunter {
    name: String,
    per_query: u32,
    fail_marker: Option<String>,
}

impl TestHunter {
    pub fn new(name: &str, per_query: u32) -> Self {
        Self {
            name: name.to_string(),
            per_query,
            fail_marker: None,
        }
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }
}

#[async_trait]
impl Hunter for TestHunter {
    async fn collect(&self, query: &HuntQuery) -> Result<Vec<CandidateRecord>, HuntError> {
        if self.fail_marker.is_some() && query.industry == self.fail_marker {
            return Err(HuntError::source_unavailable(&self.name, "scripted failure"));
        }

        let label = query.industry.as_deref().unwrap_or("general");
        Ok((0..self.per_query)
            .map(|i| {
                let mut record =
                    CandidateRecord::new(format!("{label} entity {i}"), self.name.clone());
                record.city = Some("Testville".to_string());
                record.industry = query.industry.clone();
                record.employee_count = Some(10 + i);
                record
            })
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Hunter that emits the same fixed batch for every query.
pub struct FixedHunter {
    name: String,
    batch: Vec<CandidateRecord>,
}

impl FixedHunter {
    pub fn new(name: &str, batch: Vec<CandidateRecord>) -> Self {
        Self {
            name: name.to_string(),
            batch,
        }
    }
}

#[async_trait]
impl Hunter for FixedHunter {
    async fn collect(&self, _query: &HuntQuery) -> Result<Vec<CandidateRecord>, HuntError> {
        Ok(self.batch.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
