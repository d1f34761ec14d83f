//! Phase catalog: which hunter covers which sourcing category, and the
//! queries fanned out in each phase.

use std::sync::Arc;

use leadscope_common::Config;
use registry_client::RegistryClient;

use crate::campaign::{HuntPhase, PhaseKind};
use crate::hunters::{DirectoryHunter, HuntQuery, RegistryHunter, SampleHunter};

/// Industries swept by the directory hunter in the industry-specific phase.
pub const SWEEP_INDUSTRIES: &[&str] = &[
    "manufacturing",
    "construction",
    "logistics",
    "software",
    "professional services",
];

/// Build the standard four collection phases from configuration:
/// priority-entity sourcing, mandated-sector sourcing, industry-specific
/// sourcing, then the general sweep.
pub fn build_phases(config: &Config) -> Vec<HuntPhase> {
    let registry_client = Arc::new(RegistryClient::new(
        &config.registry_api_url,
        config.registry_api_key.as_deref(),
    ));

    let registry = Arc::new(RegistryHunter::new(
        registry_client,
        config.max_records_per_hunt,
        config.mandated_industries.clone(),
    ));
    let directory = Arc::new(DirectoryHunter::new(
        &config.directory_base_url,
        config.max_records_per_hunt,
    ));
    let sample = Arc::new(SampleHunter::new(
        config.max_records_per_hunt,
        config.mandated_industries.clone(),
    ));

    let priority_query = HuntQuery {
        industry: None,
        region: config.region.clone(),
        sample_count: config.priority_target_count,
        government_only: true,
    };

    let mandated_queries: Vec<HuntQuery> = config
        .mandated_industries
        .iter()
        .map(|industry| HuntQuery {
            industry: Some(industry.clone()),
            region: config.region.clone(),
            sample_count: config.mandated_target_count,
            government_only: false,
        })
        .collect();

    let sweep_queries: Vec<HuntQuery> = SWEEP_INDUSTRIES
        .iter()
        .map(|industry| HuntQuery {
            industry: Some(industry.to_string()),
            region: config.region.clone(),
            sample_count: config.industry_target_count,
            government_only: false,
        })
        .collect();

    let general_query = HuntQuery {
        industry: None,
        region: None,
        sample_count: config.general_sample_count,
        government_only: false,
    };

    vec![
        HuntPhase {
            kind: PhaseKind::PriorityTargets,
            hunter: registry.clone(),
            queries: vec![priority_query],
        },
        HuntPhase {
            kind: PhaseKind::MandatedSectors,
            hunter: registry,
            queries: mandated_queries,
        },
        HuntPhase {
            kind: PhaseKind::IndustrySweep,
            hunter: directory,
            queries: sweep_queries,
        },
        HuntPhase {
            kind: PhaseKind::GeneralSweep,
            hunter: sample,
            queries: vec![general_query],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: None,
            registry_api_url: "https://registry.example.com/api/v1".to_string(),
            registry_api_key: None,
            directory_base_url: "https://directory.example.com/listings".to_string(),
            insight_api_url: None,
            concurrency: 4,
            rate_limit_per_minute: 100,
            batch_size: 10,
            enrich_page_size: 50,
            max_records_per_hunt: 25,
            priority_target_count: 10,
            mandated_target_count: 10,
            industry_target_count: 10,
            general_sample_count: 5,
            mandated_industries: vec!["defense".to_string(), "healthcare".to_string()],
            classification_table_path: None,
            region: Some("TX".to_string()),
        }
    }

    #[test]
    fn phases_are_ordered_and_query_counts_follow_config() {
        let phases = build_phases(&test_config());
        assert_eq!(phases.len(), 4);
        assert_eq!(phases[0].kind, PhaseKind::PriorityTargets);
        assert_eq!(phases[1].kind, PhaseKind::MandatedSectors);
        assert_eq!(phases[2].kind, PhaseKind::IndustrySweep);
        assert_eq!(phases[3].kind, PhaseKind::GeneralSweep);

        // One mandated query per configured industry.
        assert_eq!(phases[1].queries.len(), 2);
        assert_eq!(phases[2].queries.len(), SWEEP_INDUSTRIES.len());
        assert!(phases[0].queries[0].government_only);
        assert_eq!(phases[0].queries[0].region.as_deref(), Some("TX"));
    }
}
