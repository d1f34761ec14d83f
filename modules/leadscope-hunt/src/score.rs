//! Priority scorer. A deterministic weighted lookup over the record's
//! category; the table is a total order so audits can explain any ranking by
//! pointing at one row.

use leadscope_common::{ComplianceUrgency, EnrichedRecord, ScoredRecord, SizeCategory};

/// Scoring categories, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetCategory {
    GovernmentContractor,
    RegulatedLarge,
    VerifiedVendor,
    RegulatedMedium,
    LargeGeneral,
    PotentialVendor,
    SmallRegulated,
    MediumGeneral,
    SmallGeneral,
    Other,
}

impl TargetCategory {
    /// Fixed base scores. No two categories share a value.
    pub fn base_score(self) -> u8 {
        match self {
            TargetCategory::GovernmentContractor => 95,
            TargetCategory::RegulatedLarge => 85,
            TargetCategory::VerifiedVendor => 80,
            TargetCategory::RegulatedMedium => 70,
            TargetCategory::LargeGeneral => 60,
            TargetCategory::PotentialVendor => 55,
            TargetCategory::SmallRegulated => 50,
            TargetCategory::MediumGeneral => 40,
            TargetCategory::SmallGeneral => 30,
            TargetCategory::Other => 20,
        }
    }

    pub fn classify(enriched: &EnrichedRecord) -> Self {
        let record = &enriched.record;
        let size = enriched.derived.size_category;
        let large = matches!(size, SizeCategory::Large | SizeCategory::Enterprise);

        if record.government_contractor {
            TargetCategory::GovernmentContractor
        } else if record.mandated_industry && large {
            TargetCategory::RegulatedLarge
        } else if record.verified_vendor {
            TargetCategory::VerifiedVendor
        } else if record.mandated_industry && size == SizeCategory::Medium {
            TargetCategory::RegulatedMedium
        } else if large {
            TargetCategory::LargeGeneral
        } else if !record.certifications.is_empty() || !record.contract_refs.is_empty() {
            TargetCategory::PotentialVendor
        } else if record.mandated_industry && size == SizeCategory::Small {
            TargetCategory::SmallRegulated
        } else if size == SizeCategory::Medium {
            TargetCategory::MediumGeneral
        } else if size == SizeCategory::Small {
            TargetCategory::SmallGeneral
        } else {
            TargetCategory::Other
        }
    }
}

/// Urgency nudges the base score without reordering categories.
fn urgency_bonus(urgency: ComplianceUrgency) -> u8 {
    match urgency {
        ComplianceUrgency::Critical => 5,
        ComplianceUrgency::High => 3,
        _ => 0,
    }
}

pub fn score(enriched: EnrichedRecord) -> ScoredRecord {
    let category = TargetCategory::classify(&enriched);
    let urgency = enriched.derived.compliance_urgency;

    let raw = category.base_score() as u16 + urgency_bonus(urgency) as u16;
    let priority_score = raw.min(100) as u8;

    let requires_priority_handling = priority_score >= 80
        || matches!(
            urgency,
            ComplianceUrgency::High | ComplianceUrgency::Critical
        );

    ScoredRecord {
        enriched,
        priority_score,
        requires_priority_handling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use leadscope_common::{CandidateRecord, CanonicalRecord, DerivedAttributes};

    fn enriched(build: impl FnOnce(&mut CanonicalRecord, &mut DerivedAttributes)) -> EnrichedRecord {
        let mut record = CanonicalRecord::from(CandidateRecord::new("Test Entity", "test"));
        let mut derived = DerivedAttributes {
            industry_category: "Other".to_string(),
            industry_code: 9999,
            size_category: SizeCategory::Unknown,
            revenue_estimate: None,
            contact_validity: 0.0,
            timezone: None,
            data_completeness: 0.0,
            engagement_potential: 50.0,
            compliance_urgency: ComplianceUrgency::None,
            insight: None,
            enriched_at: Utc::now(),
        };
        build(&mut record, &mut derived);
        EnrichedRecord { record, derived }
    }

    #[test]
    fn base_table_is_a_total_order() {
        let categories = [
            TargetCategory::GovernmentContractor,
            TargetCategory::RegulatedLarge,
            TargetCategory::VerifiedVendor,
            TargetCategory::RegulatedMedium,
            TargetCategory::LargeGeneral,
            TargetCategory::PotentialVendor,
            TargetCategory::SmallRegulated,
            TargetCategory::MediumGeneral,
            TargetCategory::SmallGeneral,
            TargetCategory::Other,
        ];
        for pair in categories.windows(2) {
            assert!(
                pair[0].base_score() > pair[1].base_score(),
                "{:?} must outrank {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn government_contractor_outranks_everything() {
        let e = enriched(|record, derived| {
            record.government_contractor = true;
            record.mandated_industry = true;
            derived.size_category = SizeCategory::Enterprise;
        });
        assert_eq!(TargetCategory::classify(&e), TargetCategory::GovernmentContractor);
        assert_eq!(score(e).priority_score, 95);
    }

    #[test]
    fn regulated_size_splits() {
        let large = enriched(|record, derived| {
            record.mandated_industry = true;
            derived.size_category = SizeCategory::Large;
        });
        assert_eq!(TargetCategory::classify(&large), TargetCategory::RegulatedLarge);

        let medium = enriched(|record, derived| {
            record.mandated_industry = true;
            derived.size_category = SizeCategory::Medium;
        });
        assert_eq!(TargetCategory::classify(&medium), TargetCategory::RegulatedMedium);

        let small = enriched(|record, derived| {
            record.mandated_industry = true;
            derived.size_category = SizeCategory::Small;
        });
        assert_eq!(TargetCategory::classify(&small), TargetCategory::SmallRegulated);
    }

    #[test]
    fn certifications_mark_potential_vendor() {
        let e = enriched(|record, _| {
            record.certifications.insert("ISO9001".to_string());
        });
        assert_eq!(TargetCategory::classify(&e), TargetCategory::PotentialVendor);
    }

    #[test]
    fn score_is_always_within_bounds() {
        // Highest category plus the largest urgency bonus stays clamped.
        let maxed = enriched(|record, derived| {
            record.government_contractor = true;
            derived.compliance_urgency = ComplianceUrgency::Critical;
        });
        let scored = score(maxed);
        assert!(scored.priority_score <= 100);
        assert_eq!(scored.priority_score, 100);

        let bare = enriched(|_, _| {});
        assert_eq!(score(bare).priority_score, 20);
    }

    #[test]
    fn priority_handling_tracks_urgency_and_score() {
        let urgent_small = enriched(|record, derived| {
            record.mandated_industry = true;
            derived.size_category = SizeCategory::Small;
            derived.compliance_urgency = ComplianceUrgency::Critical;
        });
        let scored = score(urgent_small);
        assert!(scored.priority_score < 80);
        assert!(scored.requires_priority_handling);

        let verified = enriched(|record, _| {
            record.verified_vendor = true;
        });
        assert!(score(verified).requires_priority_handling);

        let quiet = enriched(|_, derived| {
            derived.size_category = SizeCategory::Medium;
        });
        assert!(!score(quiet).requires_priority_handling);
    }
}
