//! Campaign orchestrator. Runs the ordered phases — collection sweeps, then
//! enrichment, then scoring — fanning each phase out through a bounded worker
//! pool behind the rolling-window rate limiter. One task failing never aborts
//! its phase; the error is counted and the rest of the phase drains.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use leadscope_common::{CandidateRecord, Config, HuntError, ScoredRecord};

use crate::dedup::deduplicate;
use crate::enrich::{ClassificationTable, Enricher};
use crate::hunters::{Hunter, HuntQuery, SampleHunter};
use crate::insight::InsightClient;
use crate::rate_limit::RateLimiter;
use crate::score;
use crate::sink::RecordSink;
use crate::stats::{CampaignStats, RunStatistics};

/// Caller-supplied cancellation signal. Raising it stops new task submission;
/// in-flight tasks drain normally so no browser or network resource is
/// hard-aborted.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    PriorityTargets,
    MandatedSectors,
    IndustrySweep,
    GeneralSweep,
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseKind::PriorityTargets => write!(f, "priority_targets"),
            PhaseKind::MandatedSectors => write!(f, "mandated_sectors"),
            PhaseKind::IndustrySweep => write!(f, "industry_sweep"),
            PhaseKind::GeneralSweep => write!(f, "general_sweep"),
        }
    }
}

/// One collection phase: a hunter and the queries fanned out through it.
pub struct HuntPhase {
    pub kind: PhaseKind,
    pub hunter: Arc<dyn Hunter>,
    pub queries: Vec<HuntQuery>,
}

pub struct Campaign {
    phases: Vec<HuntPhase>,
    /// Substitute for unavailable sources. Its output is always flagged
    /// synthetic, so placeholder data stays distinguishable downstream.
    fallback: Arc<dyn Hunter>,
    enricher: Enricher,
    sink: Arc<dyn RecordSink>,
    limiter: Arc<RateLimiter>,
    stats: Arc<CampaignStats>,
    cancel: CancelFlag,
    concurrency: usize,
    batch_size: usize,
    enrich_page_size: u32,
}

impl Campaign {
    pub fn new(
        config: &Config,
        phases: Vec<HuntPhase>,
        sink: Arc<dyn RecordSink>,
        insight: Arc<dyn InsightClient>,
    ) -> Result<Self, HuntError> {
        config.validate()?;

        let table = match config.classification_table_path {
            Some(ref path) => ClassificationTable::from_json_file(path)?,
            None => ClassificationTable::default(),
        };

        Ok(Self {
            phases,
            fallback: Arc::new(SampleHunter::new(
                config.max_records_per_hunt,
                config.mandated_industries.clone(),
            )),
            enricher: Enricher::new(table, insight),
            sink,
            limiter: Arc::new(RateLimiter::per_minute(config.rate_limit_per_minute)),
            stats: Arc::new(CampaignStats::new()),
            cancel: CancelFlag::new(),
            concurrency: config.concurrency,
            batch_size: config.batch_size,
            enrich_page_size: config.enrich_page_size,
        })
    }

    /// Handle for graceful shutdown. Safe to clone into signal handlers.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run all phases to completion and return the final statistics.
    pub async fn run(&self) -> Result<RunStatistics, HuntError> {
        let started = Instant::now();

        for phase in &self.phases {
            if self.cancel.is_cancelled() {
                info!(phase = %phase.kind, "Cancelled before phase start");
                break;
            }
            self.run_collection_phase(phase).await;
        }

        if !self.cancel.is_cancelled() {
            self.run_enrichment().await;
        }
        if !self.cancel.is_cancelled() {
            self.run_scoring().await;
        }

        let stats = self.stats.snapshot(started.elapsed());
        info!("{stats}");
        Ok(stats)
    }

    /// Fan one phase's queries through the worker pool, then dedup and
    /// persist the phase batch.
    async fn run_collection_phase(&self, phase: &HuntPhase) {
        info!(phase = %phase.kind, queries = phase.queries.len(), "Starting collection phase");

        let results: Vec<(HuntQuery, Result<Vec<CandidateRecord>, HuntError>)> = stream::iter(
            phase
                .queries
                .iter()
                // Lazy: checked as the pool pulls the next task, so raising
                // the flag stops submission while in-flight tasks drain.
                .take_while(|_| !self.cancel.is_cancelled())
                .map(|query| {
                    let hunter = phase.hunter.clone();
                    let limiter = self.limiter.clone();
                    async move {
                        limiter.acquire().await;
                        (query.clone(), hunter.collect(query).await)
                    }
                }),
        )
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        let mut candidates = Vec::new();
        for (query, result) in results {
            match result {
                Ok(batch) => candidates.extend(self.validated(batch)),
                Err(e) => {
                    warn!(
                        phase = %phase.kind,
                        hunter = phase.hunter.name(),
                        error = %e,
                        "Hunt task failed, substituting flagged placeholder records"
                    );
                    self.stats.add_errors(1);
                    match self.fallback.collect(&query).await {
                        Ok(batch) => {
                            self.stats.add_synthetic_substituted(batch.len() as u32);
                            candidates.extend(self.validated(batch));
                        }
                        Err(e) => {
                            warn!(error = %e, "Fallback generation failed");
                            self.stats.add_errors(1);
                        }
                    }
                }
            }
        }

        let collected = candidates.len() as u32;
        self.stats.add_collected(collected);
        match phase.kind {
            PhaseKind::PriorityTargets => self.stats.add_priority_targets(collected),
            PhaseKind::MandatedSectors => self.stats.add_mandated_sector(collected),
            PhaseKind::IndustrySweep => self.stats.add_industry_sweep(collected),
            PhaseKind::GeneralSweep => self.stats.add_general_sweep(collected),
        }

        let outcome = deduplicate(candidates);
        self.stats.add_duplicates_removed(outcome.duplicates_removed);
        self.stats
            .add_low_confidence_merges(outcome.low_confidence_merges);
        info!(
            phase = %phase.kind,
            collected,
            canonical = outcome.records.len(),
            duplicates_removed = outcome.duplicates_removed,
            "Phase batch deduplicated"
        );

        // Persist in fixed-size batches; a failed batch is counted and the
        // remaining batches are still attempted.
        for chunk in outcome.records.chunks(self.batch_size) {
            match self.sink.upsert_candidates(chunk).await {
                Ok(report) => {
                    self.stats.add_persisted(report.stored);
                    if report.failed > 0 {
                        self.stats.add_errors(report.failed);
                    }
                }
                Err(e) => {
                    warn!(phase = %phase.kind, error = %e, "Batch upsert failed");
                    self.stats.add_errors(1);
                }
            }
        }
    }

    /// Pull unenriched records in bounded pages until exhausted.
    async fn run_enrichment(&self) {
        info!("Starting enrichment phase");
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            let page = match self.sink.fetch_unenriched(self.enrich_page_size).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(error = %e, "Failed to fetch unenriched page");
                    self.stats.add_errors(1);
                    break;
                }
            };
            if page.is_empty() {
                break;
            }

            let enriched: Vec<_> = stream::iter(page.into_iter().map(|record| {
                let limiter = self.limiter.clone();
                let enricher = &self.enricher;
                async move {
                    limiter.acquire().await;
                    enricher.enrich(record).await
                }
            }))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

            match self.sink.store_enriched(&enriched).await {
                Ok(report) => {
                    self.stats.add_enriched(report.stored);
                    if report.failed > 0 {
                        self.stats.add_errors(report.failed);
                    }
                    // A page that stores nothing would refetch forever.
                    if report.stored == 0 {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to store enriched page");
                    self.stats.add_errors(1);
                    break;
                }
            }
        }
    }

    /// Pull enriched-but-unscored records in bounded pages until exhausted.
    async fn run_scoring(&self) {
        info!("Starting scoring phase");
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            let page = match self.sink.fetch_unscored(self.enrich_page_size).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(error = %e, "Failed to fetch unscored page");
                    self.stats.add_errors(1);
                    break;
                }
            };
            if page.is_empty() {
                break;
            }

            let scored: Vec<ScoredRecord> = page.into_iter().map(score::score).collect();

            match self.sink.store_scored(&scored).await {
                Ok(report) => {
                    self.stats.add_scored(report.stored);
                    if report.failed > 0 {
                        self.stats.add_errors(report.failed);
                    }
                    if report.stored == 0 {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to store scored page");
                    self.stats.add_errors(1);
                    break;
                }
            }
        }
    }

    fn validated(&self, batch: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
        batch
            .into_iter()
            .filter(|candidate| match candidate.validate() {
                Ok(()) => true,
                Err(e) => {
                    debug!(error = %e, "Dropping invalid candidate");
                    self.stats.add_validation_rejected(1);
                    false
                }
            })
            .collect()
    }
}
