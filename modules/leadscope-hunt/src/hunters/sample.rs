use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use tracing::info;

use leadscope_common::{CandidateRecord, HuntError};

use super::{Hunter, HuntQuery};

const NAME_STEMS: &[&str] = &[
    "Summit", "Cedar", "Ironwood", "Granite", "Bluebonnet", "Pioneer", "Lakeside", "Meridian",
    "Redline", "Caprock", "Frontier", "Starlight",
];

const NAME_KINDS: &[&str] = &[
    "Fabrication",
    "Logistics",
    "Consulting",
    "Systems",
    "Machining",
    "Services",
    "Supply",
    "Engineering",
];

const CITIES: &[(&str, &str)] = &[
    ("Austin", "TX"),
    ("Tulsa", "OK"),
    ("Boise", "ID"),
    ("Dayton", "OH"),
    ("Reno", "NV"),
    ("Macon", "GA"),
];

const INDUSTRIES: &[&str] = &[
    "manufacturing",
    "defense",
    "construction",
    "healthcare",
    "software",
    "energy",
];

/// Hunter with no live integration: generates candidates from a fixed
/// template, deterministically for a given query. Every record it emits is
/// flagged `synthetic` so placeholder data can never masquerade as a live
/// observation downstream. Also used by the orchestrator as the substitute
/// when a live source is unavailable.
pub struct SampleHunter {
    max_records: usize,
    mandated_industries: Vec<String>,
}

impl SampleHunter {
    pub fn new(max_records: usize, mandated_industries: Vec<String>) -> Self {
        Self {
            max_records,
            mandated_industries,
        }
    }

    fn seed(query: &HuntQuery, index: usize) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        query.industry.hash(&mut hasher);
        query.region.hash(&mut hasher);
        index.hash(&mut hasher);
        hasher.finish()
    }

    fn generate(&self, query: &HuntQuery, index: usize) -> CandidateRecord {
        let seed = Self::seed(query, index);

        let stem = NAME_STEMS[index % NAME_STEMS.len()];
        let kind = NAME_KINDS[(index / NAME_STEMS.len()) % NAME_KINDS.len()];
        let name = format!("{stem} {kind}");
        let slug = format!(
            "{}{}",
            stem.to_lowercase(),
            kind.to_lowercase()
        );

        let (city, region) = CITIES[index % CITIES.len()];
        let industry = query
            .industry
            .clone()
            .unwrap_or_else(|| INDUSTRIES[index % INDUSTRIES.len()].to_string());
        let mandated = self
            .mandated_industries
            .iter()
            .any(|m| industry.to_lowercase().contains(m.as_str()));

        let mut record = CandidateRecord::new(name, self.name());
        record.synthetic = true;
        record.city = Some(city.to_string());
        record.region = Some(query.region.clone().unwrap_or_else(|| region.to_string()));
        record.industry = Some(industry);
        record.phone = Some(format!("512555{:04}", seed % 10_000));
        record.employee_count = Some(5 + (seed % 480) as u32);
        record.mandated_industry = mandated;
        record.requires_tracking = mandated;

        if index % 2 == 0 {
            record.address = Some(format!("{} Commerce Way", 100 + seed % 900));
        }
        if index % 3 == 0 {
            record.website = Some(format!("https://{slug}.example.com"));
        }
        if index % 4 == 0 {
            record.email = Some(format!("info@{slug}.example.com"));
        }
        if mandated {
            record.compliance_fraction = Some((seed % 100) as f32 / 100.0);
        }

        record
    }
}

#[async_trait]
impl Hunter for SampleHunter {
    async fn collect(&self, query: &HuntQuery) -> Result<Vec<CandidateRecord>, HuntError> {
        let count = (query.sample_count as usize).min(self.max_records);
        let records: Vec<CandidateRecord> =
            (0..count).map(|i| self.generate(query, i)).collect();
        info!(hunter = self.name(), count = records.len(), "Sample hunt complete");
        Ok(records)
    }

    fn name(&self) -> &str {
        "sample"
    }
}
