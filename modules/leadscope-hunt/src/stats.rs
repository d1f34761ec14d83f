//! Run statistics. One atomic accumulator is shared by every concurrent task
//! in a campaign (increment-only, no read-modify-write), then snapshotted
//! into the caller-facing [`RunStatistics`] when the run completes.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct CampaignStats {
    collected: AtomicU32,
    priority_targets: AtomicU32,
    mandated_sector: AtomicU32,
    industry_sweep: AtomicU32,
    general_sweep: AtomicU32,
    duplicates_removed: AtomicU32,
    validation_rejected: AtomicU32,
    low_confidence_merges: AtomicU32,
    synthetic_substituted: AtomicU32,
    enriched: AtomicU32,
    scored: AtomicU32,
    persisted: AtomicU32,
    errors: AtomicU32,
}

impl CampaignStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_collected(&self, n: u32) {
        self.collected.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_priority_targets(&self, n: u32) {
        self.priority_targets.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_mandated_sector(&self, n: u32) {
        self.mandated_sector.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_industry_sweep(&self, n: u32) {
        self.industry_sweep.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_general_sweep(&self, n: u32) {
        self.general_sweep.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_duplicates_removed(&self, n: u32) {
        self.duplicates_removed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_validation_rejected(&self, n: u32) {
        self.validation_rejected.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_low_confidence_merges(&self, n: u32) {
        self.low_confidence_merges.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_synthetic_substituted(&self, n: u32) {
        self.synthetic_substituted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_enriched(&self, n: u32) {
        self.enriched.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_scored(&self, n: u32) {
        self.scored.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_persisted(&self, n: u32) {
        self.persisted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_errors(&self, n: u32) {
        self.errors.fetch_add(n, Ordering::Relaxed);
    }

    pub fn errors(&self) -> u32 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, duration: Duration) -> RunStatistics {
        RunStatistics {
            total_collected: self.collected.load(Ordering::Relaxed),
            priority_targets: self.priority_targets.load(Ordering::Relaxed),
            mandated_sector: self.mandated_sector.load(Ordering::Relaxed),
            industry_sweep: self.industry_sweep.load(Ordering::Relaxed),
            general_sweep: self.general_sweep.load(Ordering::Relaxed),
            duplicates_removed: self.duplicates_removed.load(Ordering::Relaxed),
            validation_rejected: self.validation_rejected.load(Ordering::Relaxed),
            low_confidence_merges: self.low_confidence_merges.load(Ordering::Relaxed),
            synthetic_substituted: self.synthetic_substituted.load(Ordering::Relaxed),
            enriched: self.enriched.load(Ordering::Relaxed),
            scored: self.scored.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            duration,
        }
    }
}

/// Final statistics for one campaign run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatistics {
    pub total_collected: u32,
    pub priority_targets: u32,
    pub mandated_sector: u32,
    pub industry_sweep: u32,
    pub general_sweep: u32,
    pub duplicates_removed: u32,
    pub validation_rejected: u32,
    pub low_confidence_merges: u32,
    pub synthetic_substituted: u32,
    pub enriched: u32,
    pub scored: u32,
    pub persisted: u32,
    pub errors: u32,
    pub duration: Duration,
}

impl std::fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Campaign Run Complete ===")?;
        writeln!(f, "Collected:            {}", self.total_collected)?;
        writeln!(f, "  Priority targets:   {}", self.priority_targets)?;
        writeln!(f, "  Mandated sectors:   {}", self.mandated_sector)?;
        writeln!(f, "  Industry sweep:     {}", self.industry_sweep)?;
        writeln!(f, "  General sweep:      {}", self.general_sweep)?;
        writeln!(f, "Duplicates removed:   {}", self.duplicates_removed)?;
        writeln!(f, "Validation rejected:  {}", self.validation_rejected)?;
        writeln!(f, "Low-confidence merges:{}", self.low_confidence_merges)?;
        writeln!(f, "Synthetic substituted:{}", self.synthetic_substituted)?;
        writeln!(f, "Enriched:             {}", self.enriched)?;
        writeln!(f, "Scored:               {}", self.scored)?;
        writeln!(f, "Persisted:            {}", self.persisted)?;
        writeln!(f, "Errors:               {}", self.errors)?;
        writeln!(f, "Duration:             {:.1}s", self.duration.as_secs_f64())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counters_accumulate_additively() {
        let stats = CampaignStats::new();
        stats.add_collected(10);
        stats.add_collected(15);
        stats.add_duplicates_removed(2);

        let snap = stats.snapshot(Duration::from_secs(1));
        assert_eq!(snap.total_collected, 25);
        assert_eq!(snap.duplicates_removed, 2);
    }

    #[tokio::test]
    async fn concurrent_increments_lose_nothing() {
        let stats = Arc::new(CampaignStats::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let stats = stats.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    stats.add_collected(1);
                    stats.add_errors(1);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snap = stats.snapshot(Duration::ZERO);
        assert_eq!(snap.total_collected, 800);
        assert_eq!(snap.errors, 800);
    }
}
