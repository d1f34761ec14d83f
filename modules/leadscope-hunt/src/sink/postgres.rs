//! Postgres sink. Conflict resolution for the (name, city) key lives in the
//! upsert statement so that parallel batch writes cannot race-insert
//! divergent rows for the same entity.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{info, warn};
use uuid::Uuid;

use leadscope_common::{
    CanonicalRecord, DerivedAttributes, EnrichedRecord, HuntError, ScoredRecord,
};

use super::{BatchReport, RecordSink};

const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS leads (
    name TEXT NOT NULL,
    city TEXT NOT NULL DEFAULT '',
    id UUID NOT NULL,
    description TEXT,
    website TEXT,
    email TEXT,
    phone TEXT,
    address TEXT,
    region TEXT,
    industry TEXT,
    employee_count INT,
    annual_revenue DOUBLE PRECISION,
    verified_vendor BOOLEAN NOT NULL DEFAULT FALSE,
    government_contractor BOOLEAN NOT NULL DEFAULT FALSE,
    mandated_industry BOOLEAN NOT NULL DEFAULT FALSE,
    requires_tracking BOOLEAN NOT NULL DEFAULT FALSE,
    certifications TEXT[] NOT NULL DEFAULT '{}',
    contract_refs TEXT[] NOT NULL DEFAULT '{}',
    compliance_fraction REAL,
    provisional_score SMALLINT NOT NULL DEFAULT 0,
    sources TEXT[] NOT NULL DEFAULT '{}',
    merge_count INT NOT NULL DEFAULT 0,
    needs_review BOOLEAN NOT NULL DEFAULT FALSE,
    synthetic BOOLEAN NOT NULL DEFAULT FALSE,
    first_collected_at TIMESTAMPTZ NOT NULL,
    derived JSONB,
    priority_score SMALLINT,
    requires_priority_handling BOOLEAN,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (name, city)
)";

/// Field-wise conflict resolution mirroring the dedup merge policy: strings
/// keep the stored non-empty value, numerics take the max, flags OR, arrays
/// union.
const UPSERT: &str = "
INSERT INTO leads (
    name, city, id, description, website, email, phone, address, region,
    industry, employee_count, annual_revenue, verified_vendor,
    government_contractor, mandated_industry, requires_tracking,
    certifications, contract_refs, compliance_fraction, provisional_score,
    sources, merge_count, needs_review, synthetic, first_collected_at
) VALUES (
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
    $17, $18, $19, $20, $21, $22, $23, $24, $25
)
ON CONFLICT (name, city) DO UPDATE SET
    description = COALESCE(NULLIF(leads.description, ''), EXCLUDED.description),
    website = COALESCE(NULLIF(leads.website, ''), EXCLUDED.website),
    email = COALESCE(NULLIF(leads.email, ''), EXCLUDED.email),
    phone = COALESCE(NULLIF(leads.phone, ''), EXCLUDED.phone),
    address = COALESCE(NULLIF(leads.address, ''), EXCLUDED.address),
    region = COALESCE(NULLIF(leads.region, ''), EXCLUDED.region),
    industry = COALESCE(NULLIF(leads.industry, ''), EXCLUDED.industry),
    employee_count = GREATEST(leads.employee_count, EXCLUDED.employee_count),
    annual_revenue = GREATEST(leads.annual_revenue, EXCLUDED.annual_revenue),
    compliance_fraction = GREATEST(leads.compliance_fraction, EXCLUDED.compliance_fraction),
    verified_vendor = leads.verified_vendor OR EXCLUDED.verified_vendor,
    government_contractor = leads.government_contractor OR EXCLUDED.government_contractor,
    mandated_industry = leads.mandated_industry OR EXCLUDED.mandated_industry,
    requires_tracking = leads.requires_tracking OR EXCLUDED.requires_tracking,
    certifications = ARRAY(SELECT DISTINCT unnest(leads.certifications || EXCLUDED.certifications) ORDER BY 1),
    contract_refs = ARRAY(SELECT DISTINCT unnest(leads.contract_refs || EXCLUDED.contract_refs) ORDER BY 1),
    provisional_score = GREATEST(leads.provisional_score, EXCLUDED.provisional_score),
    sources = ARRAY(SELECT DISTINCT unnest(leads.sources || EXCLUDED.sources) ORDER BY 1),
    merge_count = leads.merge_count + EXCLUDED.merge_count + 1,
    needs_review = leads.needs_review OR EXCLUDED.needs_review,
    synthetic = leads.synthetic AND EXCLUDED.synthetic,
    first_collected_at = LEAST(leads.first_collected_at, EXCLUDED.first_collected_at),
    updated_at = now()";

const SELECT_COLUMNS: &str = "
    name, city, id, description, website, email, phone, address, region,
    industry, employee_count, annual_revenue, verified_vendor,
    government_contractor, mandated_industry, requires_tracking,
    certifications, contract_refs, compliance_fraction, provisional_score,
    sources, merge_count, needs_review, synthetic, first_collected_at, derived";

pub struct PostgresSink {
    pool: sqlx::PgPool,
}

impl PostgresSink {
    pub async fn connect(database_url: &str) -> Result<Self, HuntError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| HuntError::Persistence(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Idempotent schema setup, run once at startup.
    pub async fn migrate(&self) -> Result<(), HuntError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| HuntError::Persistence(e.to_string()))?;
        info!("Leads table ready");
        Ok(())
    }

    async fn upsert_one(&self, record: &CanonicalRecord) -> Result<(), sqlx::Error> {
        sqlx::query(UPSERT)
            .bind(&record.name)
            .bind(record.city.as_deref().unwrap_or(""))
            .bind(record.id)
            .bind(&record.description)
            .bind(&record.website)
            .bind(&record.email)
            .bind(&record.phone)
            .bind(&record.address)
            .bind(&record.region)
            .bind(&record.industry)
            .bind(record.employee_count.map(|n| n as i32))
            .bind(record.annual_revenue)
            .bind(record.verified_vendor)
            .bind(record.government_contractor)
            .bind(record.mandated_industry)
            .bind(record.requires_tracking)
            .bind(record.certifications.iter().cloned().collect::<Vec<_>>())
            .bind(record.contract_refs.iter().cloned().collect::<Vec<_>>())
            .bind(record.compliance_fraction)
            .bind(record.priority_score as i16)
            .bind(record.sources.iter().cloned().collect::<Vec<_>>())
            .bind(record.merge_count as i32)
            .bind(record.needs_review)
            .bind(record.synthetic)
            .bind(record.first_collected_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn canonical_from_row(row: &PgRow) -> Result<CanonicalRecord, sqlx::Error> {
    let city: String = row.try_get("city")?;
    let certifications: Vec<String> = row.try_get("certifications")?;
    let contract_refs: Vec<String> = row.try_get("contract_refs")?;
    let sources: Vec<String> = row.try_get("sources")?;
    let employee_count: Option<i32> = row.try_get("employee_count")?;
    let merge_count: i32 = row.try_get("merge_count")?;
    let provisional_score: i16 = row.try_get("provisional_score")?;
    let first_collected_at: DateTime<Utc> = row.try_get("first_collected_at")?;
    let id: Uuid = row.try_get("id")?;

    Ok(CanonicalRecord {
        id,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        website: row.try_get("website")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        city: if city.is_empty() { None } else { Some(city) },
        region: row.try_get("region")?,
        industry: row.try_get("industry")?,
        employee_count: employee_count.map(|n| n.max(0) as u32),
        annual_revenue: row.try_get("annual_revenue")?,
        verified_vendor: row.try_get("verified_vendor")?,
        government_contractor: row.try_get("government_contractor")?,
        mandated_industry: row.try_get("mandated_industry")?,
        requires_tracking: row.try_get("requires_tracking")?,
        certifications: certifications.into_iter().collect::<BTreeSet<_>>(),
        contract_refs: contract_refs.into_iter().collect::<BTreeSet<_>>(),
        compliance_fraction: row.try_get("compliance_fraction")?,
        priority_score: provisional_score.clamp(0, 100) as u8,
        sources: sources.into_iter().collect::<BTreeSet<_>>(),
        merge_count: merge_count.max(0) as u32,
        needs_review: row.try_get("needs_review")?,
        synthetic: row.try_get("synthetic")?,
        first_collected_at,
    })
}

#[async_trait]
impl RecordSink for PostgresSink {
    async fn upsert_candidates(
        &self,
        records: &[CanonicalRecord],
    ) -> Result<BatchReport, HuntError> {
        let mut report = BatchReport::default();
        for record in records {
            match self.upsert_one(record).await {
                Ok(()) => report.stored += 1,
                Err(e) => {
                    warn!(name = record.name.as_str(), error = %e, "Upsert failed for row");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn fetch_unenriched(&self, limit: u32) -> Result<Vec<CanonicalRecord>, HuntError> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM leads WHERE derived IS NULL ORDER BY name, city LIMIT $1"
        );
        let rows = sqlx::query(&query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| HuntError::Persistence(e.to_string()))?;

        rows.iter()
            .map(|row| {
                canonical_from_row(row).map_err(|e| HuntError::Persistence(e.to_string()))
            })
            .collect()
    }

    async fn store_enriched(&self, records: &[EnrichedRecord]) -> Result<BatchReport, HuntError> {
        let mut report = BatchReport::default();
        for enriched in records {
            let derived = serde_json::to_value(&enriched.derived)
                .map_err(|e| HuntError::Persistence(e.to_string()))?;
            let result = sqlx::query(
                "UPDATE leads SET derived = $3, updated_at = now() WHERE name = $1 AND city = $2",
            )
            .bind(&enriched.record.name)
            .bind(enriched.record.city.as_deref().unwrap_or(""))
            .bind(derived)
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) if done.rows_affected() > 0 => report.stored += 1,
                Ok(_) => {
                    warn!(
                        name = enriched.record.name.as_str(),
                        "No stored row for enriched record"
                    );
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(name = enriched.record.name.as_str(), error = %e, "Enrichment write failed");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn fetch_unscored(&self, limit: u32) -> Result<Vec<EnrichedRecord>, HuntError> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM leads \
             WHERE derived IS NOT NULL AND priority_score IS NULL \
             ORDER BY name, city LIMIT $1"
        );
        let rows = sqlx::query(&query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| HuntError::Persistence(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let record =
                    canonical_from_row(row).map_err(|e| HuntError::Persistence(e.to_string()))?;
                let derived_value: serde_json::Value = row
                    .try_get("derived")
                    .map_err(|e| HuntError::Persistence(e.to_string()))?;
                let derived: DerivedAttributes = serde_json::from_value(derived_value)
                    .map_err(|e| HuntError::Persistence(e.to_string()))?;
                Ok(EnrichedRecord { record, derived })
            })
            .collect()
    }

    async fn store_scored(&self, records: &[ScoredRecord]) -> Result<BatchReport, HuntError> {
        let mut report = BatchReport::default();
        for scored in records {
            let result = sqlx::query(
                "UPDATE leads SET priority_score = $3, requires_priority_handling = $4, \
                 updated_at = now() WHERE name = $1 AND city = $2",
            )
            .bind(&scored.enriched.record.name)
            .bind(scored.enriched.record.city.as_deref().unwrap_or(""))
            .bind(scored.priority_score as i16)
            .bind(scored.requires_priority_handling)
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) if done.rows_affected() > 0 => report.stored += 1,
                Ok(_) => report.failed += 1,
                Err(e) => {
                    warn!(name = scored.enriched.record.name.as_str(), error = %e, "Score write failed");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn count(&self) -> Result<u64, HuntError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM leads")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| HuntError::Persistence(e.to_string()))?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| HuntError::Persistence(e.to_string()))?;
        Ok(n.max(0) as u64)
    }
}
