//! Enrichment engine. A pure function of the canonical record plus a static
//! classification table; the only side effect is the best-effort insight
//! call. Re-enrichment replaces the derived block wholesale.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use leadscope_common::{
    normalize_name, website_domain, CanonicalRecord, ComplianceUrgency, DerivedAttributes,
    EnrichedRecord, HuntError, SizeCategory,
};

use crate::insight::{InsightClient, InsightRequest};

/// Fields counted toward data completeness.
const REQUIRED_FIELD_COUNT: f32 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndustryEntry {
    /// Substring matched against the record's industry text (lowercased).
    pub keyword: String,
    pub category: String,
    pub code: u16,
    pub revenue_per_employee: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimezoneEntry {
    pub region: String,
    pub timezone: String,
}

/// Data-driven classification tables. The built-in defaults cover the common
/// cases; deployments extend them from a JSON file without code changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationTable {
    pub industries: Vec<IndustryEntry>,
    pub timezones: Vec<TimezoneEntry>,
}

impl Default for ClassificationTable {
    fn default() -> Self {
        let industries = [
            ("defense", "Defense & Aerospace", 3364u16, 420_000.0),
            ("aerospace", "Defense & Aerospace", 3364, 420_000.0),
            ("aviation", "Defense & Aerospace", 3364, 420_000.0),
            ("manufactur", "Manufacturing", 3320, 230_000.0),
            ("fabricat", "Manufacturing", 3320, 230_000.0),
            ("machin", "Manufacturing", 3320, 230_000.0),
            ("construction", "Construction", 2362, 180_000.0),
            ("health", "Healthcare", 6216, 210_000.0),
            ("pharma", "Healthcare", 6216, 210_000.0),
            ("medical", "Healthcare", 6216, 210_000.0),
            ("software", "Software & IT", 5415, 310_000.0),
            ("technology", "Software & IT", 5415, 310_000.0),
            ("finance", "Financial Services", 5221, 380_000.0),
            ("banking", "Financial Services", 5221, 380_000.0),
            ("insurance", "Financial Services", 5221, 380_000.0),
            ("energy", "Energy & Utilities", 2211, 520_000.0),
            ("utilit", "Energy & Utilities", 2211, 520_000.0),
            ("logistics", "Logistics & Transport", 4841, 150_000.0),
            ("transport", "Logistics & Transport", 4841, 150_000.0),
            ("freight", "Logistics & Transport", 4841, 150_000.0),
            ("retail", "Retail", 4451, 120_000.0),
            ("consult", "Professional Services", 5416, 200_000.0),
        ]
        .into_iter()
        .map(|(keyword, category, code, rpe)| IndustryEntry {
            keyword: keyword.to_string(),
            category: category.to_string(),
            code,
            revenue_per_employee: rpe,
        })
        .collect();

        let timezones = [
            ("TX", "America/Chicago"),
            ("OK", "America/Chicago"),
            ("IL", "America/Chicago"),
            ("OH", "America/New_York"),
            ("GA", "America/New_York"),
            ("NY", "America/New_York"),
            ("ID", "America/Boise"),
            ("CO", "America/Denver"),
            ("NV", "America/Los_Angeles"),
            ("CA", "America/Los_Angeles"),
            ("WA", "America/Los_Angeles"),
        ]
        .into_iter()
        .map(|(region, timezone)| TimezoneEntry {
            region: region.to_string(),
            timezone: timezone.to_string(),
        })
        .collect();

        Self {
            industries,
            timezones,
        }
    }
}

/// The fallback classification when no keyword matches.
const OTHER_CATEGORY: &str = "Other";
const OTHER_CODE: u16 = 9999;
const OTHER_REVENUE_PER_EMPLOYEE: f64 = 160_000.0;

impl ClassificationTable {
    pub fn from_json_file(path: &str) -> Result<Self, HuntError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| HuntError::Config(format!("cannot read classification table: {e}")))?;
        serde_json::from_str(&raw)
            .map_err(|e| HuntError::Config(format!("invalid classification table: {e}")))
    }

    /// Substring match against the table, first hit wins, default "Other".
    fn classify(&self, industry: Option<&str>) -> (String, u16, f64) {
        if let Some(industry) = industry {
            let lowered = industry.to_lowercase();
            for entry in &self.industries {
                if lowered.contains(entry.keyword.as_str()) {
                    return (
                        entry.category.clone(),
                        entry.code,
                        entry.revenue_per_employee,
                    );
                }
            }
        }
        (
            OTHER_CATEGORY.to_string(),
            OTHER_CODE,
            OTHER_REVENUE_PER_EMPLOYEE,
        )
    }

    fn timezone(&self, region: Option<&str>) -> Option<String> {
        let region = region?.trim();
        self.timezones
            .iter()
            .find(|e| e.region.eq_ignore_ascii_case(region))
            .map(|e| e.timezone.clone())
    }
}

pub struct Enricher {
    table: ClassificationTable,
    insight: Arc<dyn InsightClient>,
}

impl Enricher {
    pub fn new(table: ClassificationTable, insight: Arc<dyn InsightClient>) -> Self {
        Self { table, insight }
    }

    pub async fn enrich(&self, record: CanonicalRecord) -> EnrichedRecord {
        let (industry_category, industry_code, revenue_per_employee) =
            self.table.classify(record.industry.as_deref());
        let size_category = SizeCategory::from_employee_count(record.employee_count);

        let revenue_estimate = match record.annual_revenue {
            Some(revenue) => Some(revenue),
            None => record.employee_count.map(|count| {
                count as f64 * revenue_per_employee * revenue_factor(&record.name)
            }),
        };

        let data_completeness = completeness(&record);
        let contact_validity = contact_validity(&record);
        let engagement_potential = engagement(&record, size_category, data_completeness);
        let compliance_urgency = urgency(&record);
        let timezone = self.table.timezone(record.region.as_deref());

        let request = InsightRequest {
            name: record.name.clone(),
            industry: record.industry.clone(),
            size_category,
        };
        let insight = match self.insight.insight(&request).await {
            Ok(summary) if !summary.trim().is_empty() => Some(summary),
            Ok(_) => None,
            Err(e) => {
                debug!(name = record.name.as_str(), error = %e, "Insight call failed, continuing without");
                None
            }
        };

        let derived = DerivedAttributes {
            industry_category,
            industry_code,
            size_category,
            revenue_estimate,
            contact_validity,
            timezone,
            data_completeness,
            engagement_potential,
            compliance_urgency,
            insight,
            enriched_at: Utc::now(),
        };

        EnrichedRecord { record, derived }
    }
}

/// Deterministic stand-in for sampling noise on revenue estimates. Derived
/// from a stable hash of the normalized name so repeated runs produce the
/// same estimate for the same entity. Range [0.8, 1.2].
fn revenue_factor(name: &str) -> f64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    normalize_name(name).hash(&mut hasher);
    0.8 + (hasher.finish() % 4001) as f64 / 10_000.0
}

fn filled(value: Option<&str>) -> bool {
    !value.map(str::trim).unwrap_or("").is_empty()
}

/// Filled required fields / 10, as a percentage.
fn completeness(record: &CanonicalRecord) -> f32 {
    let mut count = 0u32;
    if !record.name.trim().is_empty() {
        count += 1;
    }
    for field in [
        record.description.as_deref(),
        record.website.as_deref(),
        record.email.as_deref(),
        record.phone.as_deref(),
        record.address.as_deref(),
        record.city.as_deref(),
        record.region.as_deref(),
        record.industry.as_deref(),
    ] {
        if filled(field) {
            count += 1;
        }
    }
    if record.employee_count.is_some() {
        count += 1;
    }
    count as f32 / REQUIRED_FIELD_COUNT * 100.0
}

/// Fraction of the three contact channels (email, phone, website) present
/// and well formed.
fn contact_validity(record: &CanonicalRecord) -> f32 {
    let mut valid = 0u32;
    if record.email.is_some() {
        valid += 1;
    }
    if record.phone.as_deref().map(str::len).unwrap_or(0) == 10 {
        valid += 1;
    }
    if record.website.as_deref().and_then(website_domain).is_some() {
        valid += 1;
    }
    valid as f32 / 3.0
}

fn engagement(record: &CanonicalRecord, size: SizeCategory, completeness: f32) -> f32 {
    let mut score = 50.0;
    if record.government_contractor {
        score += 30.0;
    }
    if record.mandated_industry {
        score += 20.0;
    }
    score += match size {
        SizeCategory::Large | SizeCategory::Enterprise => 15.0,
        SizeCategory::Medium => 10.0,
        _ => 0.0,
    };
    score += 0.2 * completeness;
    score.min(100.0)
}

/// Compliance-fraction threshold ladder. `None` for entities outside
/// regulatory tracking; an absent fraction is treated as nothing filed.
fn urgency(record: &CanonicalRecord) -> ComplianceUrgency {
    if !record.requires_tracking {
        return ComplianceUrgency::None;
    }
    let fraction = record.compliance_fraction.unwrap_or(0.0);
    if fraction >= 0.9 {
        ComplianceUrgency::Low
    } else if fraction >= 0.7 {
        ComplianceUrgency::Medium
    } else if fraction >= 0.5 {
        ComplianceUrgency::High
    } else {
        ComplianceUrgency::Critical
    }
}
