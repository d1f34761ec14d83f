use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HuntError;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeCategory {
    Unknown,
    Small,
    Medium,
    Large,
    Enterprise,
}

impl SizeCategory {
    /// Employee-count thresholds: Small <20, Medium <100, Large <500,
    /// Enterprise >=500, Unknown when the count is absent.
    pub fn from_employee_count(count: Option<u32>) -> Self {
        match count {
            None => SizeCategory::Unknown,
            Some(n) if n < 20 => SizeCategory::Small,
            Some(n) if n < 100 => SizeCategory::Medium,
            Some(n) if n < 500 => SizeCategory::Large,
            Some(_) => SizeCategory::Enterprise,
        }
    }
}

impl std::fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeCategory::Unknown => write!(f, "unknown"),
            SizeCategory::Small => write!(f, "small"),
            SizeCategory::Medium => write!(f, "medium"),
            SizeCategory::Large => write!(f, "large"),
            SizeCategory::Enterprise => write!(f, "enterprise"),
        }
    }
}

/// How urgently a tracked entity needs compliance attention. `None` for
/// entities outside regulatory tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceUrgency {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for ComplianceUrgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplianceUrgency::None => write!(f, "none"),
            ComplianceUrgency::Low => write!(f, "low"),
            ComplianceUrgency::Medium => write!(f, "medium"),
            ComplianceUrgency::High => write!(f, "high"),
            ComplianceUrgency::Critical => write!(f, "critical"),
        }
    }
}

// --- Candidate (raw, per-source) ---

/// One source's raw view of one business entity, pre-deduplication.
/// Hunters must tolerate absent optionals and normalize phone/email before
/// returning. Consumed and discarded by the dedup engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub industry: Option<String>,
    pub employee_count: Option<u32>,
    pub annual_revenue: Option<f64>,
    /// Confirmed vendor of the target type (e.g. appears on a verified roster).
    pub verified_vendor: bool,
    /// Holds or recently held government contracts.
    pub government_contractor: bool,
    /// Operates in an industry on the configured mandate list.
    pub mandated_industry: bool,
    /// Subject to regulatory tracking (drives compliance urgency).
    pub requires_tracking: bool,
    pub certifications: BTreeSet<String>,
    pub contract_refs: BTreeSet<String>,
    /// Fraction of applicable compliance items already satisfied (0.0-1.0),
    /// when the source reports it.
    pub compliance_fraction: Option<f32>,
    /// Provisional score carried from the source; recomputed by the scorer.
    pub priority_score: u8,
    /// Which hunter produced this candidate.
    pub source: String,
    /// Generated placeholder data, never a live observation. Synthetic
    /// candidates are flagged all the way through to the sink.
    pub synthetic: bool,
    pub collected_at: DateTime<Utc>,
}

impl CandidateRecord {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            website: None,
            email: None,
            phone: None,
            address: None,
            city: None,
            region: None,
            industry: None,
            employee_count: None,
            annual_revenue: None,
            verified_vendor: false,
            government_contractor: false,
            mandated_industry: false,
            requires_tracking: false,
            certifications: BTreeSet::new(),
            contract_refs: BTreeSet::new(),
            compliance_fraction: None,
            priority_score: 0,
            source: source.into(),
            synthetic: false,
            collected_at: Utc::now(),
        }
    }

    /// Schema validation. A failing candidate is dropped individually, never
    /// the batch it arrived in.
    pub fn validate(&self) -> Result<(), HuntError> {
        if self.name.trim().is_empty() {
            return Err(HuntError::Validation("candidate has no name".to_string()));
        }
        if let Some(ref email) = self.email {
            if crate::normalize::normalize_email(email).is_none() {
                return Err(HuntError::Validation(format!(
                    "malformed email for {}: {email}",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

// --- Canonical (merged) ---

/// The deduplicated, merged representation of one real-world entity.
/// Exactly one exists per distinct entity per run. Mutated only by the merge
/// step; immutable once enrichment begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub industry: Option<String>,
    pub employee_count: Option<u32>,
    pub annual_revenue: Option<f64>,
    pub verified_vendor: bool,
    pub government_contractor: bool,
    pub mandated_industry: bool,
    pub requires_tracking: bool,
    pub certifications: BTreeSet<String>,
    pub contract_refs: BTreeSet<String>,
    pub compliance_fraction: Option<f32>,
    pub priority_score: u8,
    /// Every hunter that contributed to this record.
    pub sources: BTreeSet<String>,
    /// How many candidates were merged into this record beyond the first.
    pub merge_count: u32,
    /// Set when a merge matched on the normalized-phone key alone. Shared
    /// office lines make phone-only matches the weakest identity evidence;
    /// these records are surfaced for review instead of silently trusted.
    pub needs_review: bool,
    /// True when every contributing candidate was generated placeholder data.
    pub synthetic: bool,
    pub first_collected_at: DateTime<Utc>,
}

impl From<CandidateRecord> for CanonicalRecord {
    fn from(c: CandidateRecord) -> Self {
        let mut sources = BTreeSet::new();
        sources.insert(c.source);
        Self {
            id: Uuid::new_v4(),
            name: c.name,
            description: c.description,
            website: c.website,
            email: c.email,
            phone: c.phone,
            address: c.address,
            city: c.city,
            region: c.region,
            industry: c.industry,
            employee_count: c.employee_count,
            annual_revenue: c.annual_revenue,
            verified_vendor: c.verified_vendor,
            government_contractor: c.government_contractor,
            mandated_industry: c.mandated_industry,
            requires_tracking: c.requires_tracking,
            certifications: c.certifications,
            contract_refs: c.contract_refs,
            compliance_fraction: c.compliance_fraction,
            priority_score: c.priority_score,
            sources,
            merge_count: 0,
            needs_review: false,
            synthetic: c.synthetic,
            first_collected_at: c.collected_at,
        }
    }
}

fn keep_or_take(existing: &mut Option<String>, incoming: Option<&str>) {
    let is_empty = existing.as_deref().map(str::trim).unwrap_or("").is_empty();
    if is_empty {
        if let Some(v) = incoming {
            if !v.trim().is_empty() {
                *existing = Some(v.to_string());
            }
        }
    }
}

fn max_opt<T: PartialOrd + Copy>(existing: &mut Option<T>, incoming: Option<T>) {
    match (*existing, incoming) {
        (Some(a), Some(b)) if b > a => *existing = Some(b),
        (None, Some(b)) => *existing = Some(b),
        _ => {}
    }
}

impl CanonicalRecord {
    /// Field-wise merge of a duplicate candidate into this record.
    /// Deterministic: strings keep the existing non-empty value, numerics take
    /// the max (collected counts are lower bounds), flags OR, sets union.
    pub fn absorb(&mut self, c: &CandidateRecord) {
        keep_or_take(&mut self.description, c.description.as_deref());
        keep_or_take(&mut self.website, c.website.as_deref());
        keep_or_take(&mut self.email, c.email.as_deref());
        keep_or_take(&mut self.phone, c.phone.as_deref());
        keep_or_take(&mut self.address, c.address.as_deref());
        keep_or_take(&mut self.city, c.city.as_deref());
        keep_or_take(&mut self.region, c.region.as_deref());
        keep_or_take(&mut self.industry, c.industry.as_deref());

        max_opt(&mut self.employee_count, c.employee_count);
        max_opt(&mut self.annual_revenue, c.annual_revenue);
        max_opt(&mut self.compliance_fraction, c.compliance_fraction);

        self.verified_vendor |= c.verified_vendor;
        self.government_contractor |= c.government_contractor;
        self.mandated_industry |= c.mandated_industry;
        self.requires_tracking |= c.requires_tracking;

        self.certifications
            .extend(c.certifications.iter().cloned());
        self.contract_refs.extend(c.contract_refs.iter().cloned());

        self.sources.insert(c.source.clone());
        self.merge_count += 1;
        self.priority_score = self.priority_score.max(c.priority_score);
        self.synthetic &= c.synthetic;
        if c.collected_at < self.first_collected_at {
            self.first_collected_at = c.collected_at;
        }
    }

    /// Merge another canonical record into this one. Used by the final
    /// key-collision reduction when two surviving records turn out to share a
    /// composite identity.
    pub fn absorb_record(&mut self, other: &CanonicalRecord) {
        keep_or_take(&mut self.description, other.description.as_deref());
        keep_or_take(&mut self.website, other.website.as_deref());
        keep_or_take(&mut self.email, other.email.as_deref());
        keep_or_take(&mut self.phone, other.phone.as_deref());
        keep_or_take(&mut self.address, other.address.as_deref());
        keep_or_take(&mut self.city, other.city.as_deref());
        keep_or_take(&mut self.region, other.region.as_deref());
        keep_or_take(&mut self.industry, other.industry.as_deref());

        max_opt(&mut self.employee_count, other.employee_count);
        max_opt(&mut self.annual_revenue, other.annual_revenue);
        max_opt(&mut self.compliance_fraction, other.compliance_fraction);

        self.verified_vendor |= other.verified_vendor;
        self.government_contractor |= other.government_contractor;
        self.mandated_industry |= other.mandated_industry;
        self.requires_tracking |= other.requires_tracking;

        self.certifications
            .extend(other.certifications.iter().cloned());
        self.contract_refs
            .extend(other.contract_refs.iter().cloned());

        self.sources.extend(other.sources.iter().cloned());
        self.merge_count += other.merge_count + 1;
        self.priority_score = self.priority_score.max(other.priority_score);
        self.needs_review |= other.needs_review;
        self.synthetic &= other.synthetic;
        if other.first_collected_at < self.first_collected_at {
            self.first_collected_at = other.first_collected_at;
        }
    }
}

// --- Derived attributes (enrichment output) ---

/// The enrichment block. Replaced atomically on re-enrichment, never patched
/// field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedAttributes {
    pub industry_category: String,
    pub industry_code: u16,
    pub size_category: SizeCategory,
    pub revenue_estimate: Option<f64>,
    /// Fraction of contact channels (email, phone, website) present and
    /// well formed (0.0-1.0).
    pub contact_validity: f32,
    pub timezone: Option<String>,
    /// Filled required fields / total required fields, as a percentage.
    pub data_completeness: f32,
    /// Weighted engagement score capped at 100.
    pub engagement_potential: f32,
    pub compliance_urgency: ComplianceUrgency,
    /// Best-effort natural-language summary from the insight service.
    pub insight: Option<String>,
    pub enriched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub record: CanonicalRecord,
    pub derived: DerivedAttributes,
}

/// Terminal artifact persisted to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub enriched: EnrichedRecord,
    /// Bounded priority score in [0, 100].
    pub priority_score: u8,
    pub requires_priority_handling: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, source: &str) -> CandidateRecord {
        CandidateRecord::new(name, source)
    }

    #[test]
    fn size_category_thresholds() {
        assert_eq!(
            SizeCategory::from_employee_count(None),
            SizeCategory::Unknown
        );
        assert_eq!(
            SizeCategory::from_employee_count(Some(19)),
            SizeCategory::Small
        );
        assert_eq!(
            SizeCategory::from_employee_count(Some(20)),
            SizeCategory::Medium
        );
        assert_eq!(
            SizeCategory::from_employee_count(Some(499)),
            SizeCategory::Large
        );
        assert_eq!(
            SizeCategory::from_employee_count(Some(500)),
            SizeCategory::Enterprise
        );
    }

    #[test]
    fn merge_keeps_existing_strings_and_fills_gaps() {
        let mut a = candidate("Acme Widget", "registry");
        a.website = Some("https://acme.example.com".to_string());
        let mut canonical = CanonicalRecord::from(a);

        let mut b = candidate("Acme Widget Inc", "directory");
        b.website = Some("https://other.example.com".to_string());
        b.phone = Some("5125550100".to_string());
        canonical.absorb(&b);

        // Existing non-empty wins; absent fields are filled.
        assert_eq!(
            canonical.website.as_deref(),
            Some("https://acme.example.com")
        );
        assert_eq!(canonical.phone.as_deref(), Some("5125550100"));
    }

    #[test]
    fn merge_monotonicity_no_field_lost() {
        let mut a = candidate("Acme", "registry");
        a.email = Some("info@acme.example.com".to_string());
        a.certifications.insert("ISO9001".to_string());

        let mut b = candidate("Acme", "directory");
        b.address = Some("1 Main St".to_string());
        b.certifications.insert("CMMC-2".to_string());

        let mut canonical = CanonicalRecord::from(a);
        canonical.absorb(&b);

        assert!(canonical.email.is_some());
        assert!(canonical.address.is_some());
        assert!(canonical.certifications.contains("ISO9001"));
        assert!(canonical.certifications.contains("CMMC-2"));
    }

    #[test]
    fn numeric_merge_is_max_in_either_order() {
        let mut big = candidate("Acme", "a");
        big.employee_count = Some(50);
        let mut small = candidate("Acme", "b");
        small.employee_count = Some(30);

        let mut first = CanonicalRecord::from(big.clone());
        first.absorb(&small);
        assert_eq!(first.employee_count, Some(50));

        let mut second = CanonicalRecord::from(small);
        second.absorb(&big);
        assert_eq!(second.employee_count, Some(50));
    }

    #[test]
    fn flags_or_and_provenance_accumulates() {
        let mut a = candidate("Acme", "registry");
        a.government_contractor = true;
        let mut b = candidate("Acme", "directory");
        b.mandated_industry = true;
        b.priority_score = 40;

        let mut canonical = CanonicalRecord::from(a);
        canonical.absorb(&b);

        assert!(canonical.government_contractor);
        assert!(canonical.mandated_industry);
        assert_eq!(canonical.merge_count, 1);
        assert_eq!(canonical.priority_score, 40);
        assert_eq!(canonical.sources.len(), 2);
    }

    #[test]
    fn synthetic_clears_when_any_source_is_real() {
        let mut a = candidate("Acme", "sample");
        a.synthetic = true;
        let b = candidate("Acme", "registry");

        let mut canonical = CanonicalRecord::from(a);
        assert!(canonical.synthetic);
        canonical.absorb(&b);
        assert!(!canonical.synthetic);
    }

    #[test]
    fn validation_rejects_missing_name_and_bad_email() {
        let empty = candidate("   ", "registry");
        assert!(empty.validate().is_err());

        let mut bad_email = candidate("Acme", "registry");
        bad_email.email = Some("not-an-email".to_string());
        assert!(bad_email.validate().is_err());

        let ok = candidate("Acme", "registry");
        assert!(ok.validate().is_ok());
    }
}
