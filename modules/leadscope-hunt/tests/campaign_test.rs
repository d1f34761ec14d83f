//! End-to-end campaign tests against deterministic fakes: scripted hunters,
//! the in-memory sink, no network.

use std::sync::Arc;

use leadscope_common::{CandidateRecord, Config};
use leadscope_hunt::campaign::{Campaign, HuntPhase, PhaseKind};
use leadscope_hunt::hunters::HuntQuery;
use leadscope_hunt::insight::NoopInsightClient;
use leadscope_hunt::sink::{MemorySink, RecordSink};
use leadscope_hunt::testing::{FixedHunter, TestHunter};

fn test_config() -> Config {
    Config {
        database_url: None,
        registry_api_url: "https://registry.example.com/api/v1".to_string(),
        registry_api_key: None,
        directory_base_url: "https://directory.example.com/listings".to_string(),
        insight_api_url: None,
        concurrency: 4,
        rate_limit_per_minute: 0, // unlimited, tests should not pace
        batch_size: 10,
        enrich_page_size: 8,
        max_records_per_hunt: 100,
        priority_target_count: 10,
        mandated_target_count: 10,
        industry_target_count: 10,
        general_sample_count: 5,
        mandated_industries: vec!["defense".to_string()],
        classification_table_path: None,
        region: None,
    }
}

fn query(industry: &str) -> HuntQuery {
    HuntQuery::builder().industry(industry).sample_count(2u32).build()
}

#[tokio::test]
async fn failing_task_is_isolated_and_substituted() {
    let sink = Arc::new(MemorySink::new());
    let phases = vec![HuntPhase {
        kind: PhaseKind::IndustrySweep,
        hunter: Arc::new(TestHunter::new("flaky", 3).failing_on("poison")),
        queries: vec![
            query("alpha"),
            query("beta"),
            query("poison"),
            query("gamma"),
            query("delta"),
        ],
    }];

    let campaign = Campaign::new(
        &test_config(),
        phases,
        sink.clone(),
        Arc::new(NoopInsightClient),
    )
    .unwrap();
    let stats = campaign.run().await.unwrap();

    // Exactly one task failed; the other four landed in full.
    assert_eq!(stats.errors, 1);
    // 4 surviving tasks x 3 records + 2 substituted placeholders.
    assert_eq!(stats.synthetic_substituted, 2);
    assert_eq!(stats.total_collected, 14);
    assert_eq!(stats.persisted, 14);
    assert_eq!(sink.count().await.unwrap(), 14);

    // Survivors are present by name; placeholders are flagged synthetic.
    assert!(sink.get("alpha entity 0", "Testville").is_some());
    assert!(sink.get("delta entity 2", "Testville").is_some());
    let synthetic = sink
        .all()
        .into_iter()
        .filter(|row| row.canonical.synthetic)
        .count();
    assert_eq!(synthetic, 2);
}

#[tokio::test]
async fn statistics_accumulate_across_phases_and_sink_resolves_cross_batch_keys() {
    let sink = Arc::new(MemorySink::new());

    let batch_a: Vec<CandidateRecord> = (0..10)
        .map(|i| {
            let mut c = CandidateRecord::new(format!("Batch A {i}"), "fixed-a");
            c.city = Some("Austin".to_string());
            c.employee_count = Some(30);
            c
        })
        .collect();

    // 13 unique plus 2 that collide with batch A's keys.
    let mut batch_b: Vec<CandidateRecord> = (0..13)
        .map(|i| {
            let mut c = CandidateRecord::new(format!("Batch B {i}"), "fixed-b");
            c.city = Some("Tulsa".to_string());
            c
        })
        .collect();
    for i in 0..2 {
        let mut c = CandidateRecord::new(format!("Batch A {i}"), "fixed-b");
        c.city = Some("Austin".to_string());
        c.employee_count = Some(50);
        batch_b.push(c);
    }

    let phases = vec![
        HuntPhase {
            kind: PhaseKind::PriorityTargets,
            hunter: Arc::new(FixedHunter::new("fixed-a", batch_a)),
            queries: vec![query("alpha")],
        },
        HuntPhase {
            kind: PhaseKind::GeneralSweep,
            hunter: Arc::new(FixedHunter::new("fixed-b", batch_b)),
            queries: vec![query("beta")],
        },
    ];

    let campaign = Campaign::new(
        &test_config(),
        phases,
        sink.clone(),
        Arc::new(NoopInsightClient),
    )
    .unwrap();
    let stats = campaign.run().await.unwrap();

    // Additive across phases.
    assert_eq!(stats.total_collected, 25);
    assert_eq!(stats.priority_targets, 10);
    assert_eq!(stats.general_sweep, 15);
    // No duplicates within either phase batch.
    assert_eq!(stats.duplicates_removed, 0);
    assert_eq!(stats.errors, 0);

    // Cross-batch key collisions are the sink's job: 25 rows in, 23 keys.
    assert_eq!(sink.count().await.unwrap(), 23);
    let merged = sink.get("Batch A 0", "Austin").unwrap();
    assert_eq!(merged.canonical.employee_count, Some(50));
    assert!(merged.canonical.sources.contains("fixed-a"));
    assert!(merged.canonical.sources.contains("fixed-b"));
}

#[tokio::test]
async fn full_pipeline_enriches_and_scores_every_record() {
    let sink = Arc::new(MemorySink::new());
    let phases = vec![HuntPhase {
        kind: PhaseKind::MandatedSectors,
        hunter: Arc::new(TestHunter::new("steady", 7)),
        queries: vec![query("defense"), query("healthcare")],
    }];

    let campaign = Campaign::new(
        &test_config(),
        phases,
        sink.clone(),
        Arc::new(NoopInsightClient),
    )
    .unwrap();
    let stats = campaign.run().await.unwrap();

    assert_eq!(stats.total_collected, 14);
    // Paged enrichment drains the sink even when pages are smaller than the
    // record count (page size 8 over 14 rows).
    assert_eq!(stats.enriched, 14);
    assert_eq!(stats.scored, 14);

    for row in sink.all() {
        let derived = row.derived.expect("every row enriched");
        assert!(derived.data_completeness > 0.0);
        let score = row.priority_score.expect("every row scored");
        assert!(score <= 100);
    }
}

#[tokio::test]
async fn cancellation_stops_task_submission() {
    let sink = Arc::new(MemorySink::new());
    let phases = vec![HuntPhase {
        kind: PhaseKind::GeneralSweep,
        hunter: Arc::new(TestHunter::new("steady", 3)),
        queries: vec![query("alpha"), query("beta")],
    }];

    let campaign = Campaign::new(
        &test_config(),
        phases,
        sink.clone(),
        Arc::new(NoopInsightClient),
    )
    .unwrap();

    campaign.cancel_flag().cancel();
    let stats = campaign.run().await.unwrap();

    assert_eq!(stats.total_collected, 0);
    assert_eq!(stats.enriched, 0);
    assert_eq!(sink.count().await.unwrap(), 0);
}

#[tokio::test]
async fn validation_drops_single_candidates_not_batches() {
    let sink = Arc::new(MemorySink::new());

    let mut batch = vec![
        CandidateRecord::new("Valid Entity", "fixed"),
        CandidateRecord::new("  ", "fixed"),
    ];
    batch[0].city = Some("Austin".to_string());
    let mut bad_email = CandidateRecord::new("Broken Mail", "fixed");
    bad_email.email = Some("nonsense".to_string());
    bad_email.city = Some("Austin".to_string());
    batch.push(bad_email);

    let phases = vec![HuntPhase {
        kind: PhaseKind::GeneralSweep,
        hunter: Arc::new(FixedHunter::new("fixed", batch)),
        queries: vec![query("alpha")],
    }];

    let campaign = Campaign::new(
        &test_config(),
        phases,
        sink.clone(),
        Arc::new(NoopInsightClient),
    )
    .unwrap();
    let stats = campaign.run().await.unwrap();

    assert_eq!(stats.validation_rejected, 2);
    assert_eq!(stats.total_collected, 1);
    assert_eq!(sink.count().await.unwrap(), 1);
    assert!(sink.get("Valid Entity", "Austin").is_some());
}
