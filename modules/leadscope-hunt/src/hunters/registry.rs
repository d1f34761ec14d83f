use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use leadscope_common::{normalize_email, normalize_phone, CandidateRecord, HuntError};
use registry_client::{CompanyRow, RegistryClient};

use super::{Hunter, HuntQuery};

/// Hunter backed by the business-registry REST API. The registry is the only
/// source that reports vendor verification, contract references, and filing
/// compliance, so its rows carry the richest flag set.
pub struct RegistryHunter {
    client: Arc<RegistryClient>,
    max_records: usize,
    /// Lowercased industry names subject to regulatory mandates.
    mandated_industries: Vec<String>,
}

impl RegistryHunter {
    pub fn new(
        client: Arc<RegistryClient>,
        max_records: usize,
        mandated_industries: Vec<String>,
    ) -> Self {
        Self {
            client,
            max_records,
            mandated_industries,
        }
    }

    fn to_candidate(&self, row: CompanyRow) -> CandidateRecord {
        let mandated = row
            .industry
            .as_deref()
            .map(|industry| {
                let industry = industry.to_lowercase();
                self.mandated_industries
                    .iter()
                    .any(|m| industry.contains(m.as_str()))
            })
            .unwrap_or(false);

        let mut record = CandidateRecord::new(row.name, self.name());
        record.description = row.description;
        record.website = row.website;
        record.email = row.email.as_deref().and_then(normalize_email);
        record.phone = row.phone.as_deref().and_then(normalize_phone);
        record.address = row.street_address;
        record.city = row.city;
        record.region = row.region;
        record.industry = row.industry;
        record.employee_count = row.employee_count;
        record.annual_revenue = row.annual_revenue;
        record.verified_vendor = row.verified_vendor;
        record.government_contractor = row.government_contractor;
        record.mandated_industry = mandated;
        record.requires_tracking = mandated || row.government_contractor;
        record.certifications = row.certifications.into_iter().collect();
        record.contract_refs = row.contract_numbers.into_iter().collect();
        record.compliance_fraction = row.filing_compliance;
        record
    }
}

#[async_trait]
impl Hunter for RegistryHunter {
    async fn collect(&self, query: &HuntQuery) -> Result<Vec<CandidateRecord>, HuntError> {
        let limit = self.max_records as u32;
        let rows = if query.government_only {
            self.client
                .government_vendors(query.region.as_deref(), limit)
                .await
        } else {
            self.client
                .search_companies(query.industry.as_deref(), query.region.as_deref(), limit)
                .await
        }
        .map_err(|e| HuntError::source_unavailable(self.name(), e))?;

        let records: Vec<CandidateRecord> = rows
            .into_iter()
            .take(self.max_records)
            .map(|row| self.to_candidate(row))
            .collect();

        info!(
            hunter = self.name(),
            industry = query.industry.as_deref().unwrap_or("-"),
            government_only = query.government_only,
            count = records.len(),
            "Registry hunt complete"
        );
        Ok(records)
    }

    fn name(&self) -> &str {
        "registry"
    }
}
