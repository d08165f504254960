// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Workflow End-to-End Tests
//!
//! Full-engine runs against fixture extractors and in-memory sessions:
//! the happy path, halt-on-failure across days, transform fail-fast,
//! null-sort-key handling, external-sort equivalence, and single-instance
//! rejection.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::{
    null_key_quote_record, quote_record, test_config, trade_record, FixtureExtractor,
    FlakySession, RecordingSession,
};
use marketdata_etl::infrastructure::loading::MemorySession;
use marketdata_etl::EtlApplication;
use marketdata_etl_bootstrap::single_instance::SingleInstanceLock;
use marketdata_etl_domain::records::BondFutureQuoteSource;
use marketdata_etl_domain::{
    attribute_keys, DateRange, DbSession, Phase, SortMemoryLimit, SourceRecord, TradeDate,
};

fn range(from: &str, to: &str) -> DateRange {
    DateRange::new(TradeDate::parse(from).unwrap(), TradeDate::parse(to).unwrap()).unwrap()
}

fn lock_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("etl.lock")
}

fn build(
    records: Vec<SourceRecord>,
    session: Arc<dyn DbSession>,
    dir: &tempfile::TempDir,
) -> EtlApplication {
    EtlApplication::build_with(
        test_config(),
        vec![FixtureExtractor::new(records)],
        session,
        lock_path(dir),
    )
    .unwrap()
}

#[tokio::test]
async fn test_happy_path_single_day() {
    let dir = tempfile::tempdir().unwrap();
    let session = Arc::new(MemorySession::new());
    let records: Vec<SourceRecord> = (0..1000).map(quote_record).collect();
    let application = build(records, session.clone(), &dir);

    let result = application.run(range("20250101", "20250101")).await.unwrap();

    assert_eq!(result.total_days(), 1);
    assert_eq!(result.successful_days(), 1);
    assert_eq!(result.failed_days(), 0);
    assert!(!result.halted());

    let day = result.per_day.values().next().unwrap();
    assert!(day.success);
    assert_eq!(day.snapshot.extracted_count, Some(1000));
    assert_eq!(day.snapshot.transformed_count, Some(1000));
    assert_eq!(day.snapshot.loaded_count, Some(1000));
    assert_eq!(day.snapshot.validation_passed, Some(true));
    assert_eq!(day.snapshot.cleanup_done, Some(true));
    assert_eq!(day.snapshot.current_phase, Phase::Complete);

    // Phase-complete sequence is exactly the canonical pipeline, once each
    let phases: Vec<Phase> = day.per_phase.iter().map(|r| r.phase).collect();
    assert_eq!(phases, Phase::PIPELINE.to_vec());
    assert!(day.per_phase.iter().all(|r| r.success));

    // Counter chain for a completed day
    let loaded = day.snapshot.loaded_count.unwrap();
    let transformed = day.snapshot.transformed_count.unwrap();
    let extracted = day.snapshot.extracted_count.unwrap();
    assert!(loaded <= transformed && transformed <= extracted);

    // Staging table dropped after Clean
    assert!(session.table_names().is_empty());
}

#[tokio::test]
async fn test_halt_on_day_two_load_failure() {
    let dir = tempfile::tempdir().unwrap();
    let inner = Arc::new(MemorySession::new());
    // Day 1 inserts once into the quote staging table; the second insert
    // (day 2) is rejected by the server
    let session = FlakySession::new(inner.clone(), "xbond_quote", 2);
    let records: Vec<SourceRecord> = (0..100).map(quote_record).collect();
    let application = build(records, session, &dir);

    let result = application.run(range("20250101", "20250103")).await.unwrap();

    assert_eq!(result.total_days(), 2);
    assert_eq!(result.successful_days(), 1);
    assert_eq!(result.failed_days(), 1);
    assert!(result.halted());

    let day1 = &result.per_day[&TradeDate::parse("20250101").unwrap()];
    assert!(day1.success);

    let day2 = &result.per_day[&TradeDate::parse("20250102").unwrap()];
    assert!(!day2.success);
    assert_eq!(day2.failed_phase, Some(Phase::Load));
    assert!(day2.failure.as_ref().unwrap().contains("rejected"));

    // Day 3 was never attempted
    assert!(!result.per_day.contains_key(&TradeDate::parse("20250103").unwrap()));

    // Day 2's staging table is retained for forensics
    let leftovers = inner.table_names();
    assert_eq!(leftovers.len(), 1);
    assert!(leftovers[0].starts_with("tmp_xbond_quote_"));
}

#[tokio::test]
async fn test_transform_fail_fast_stops_the_day_before_load() {
    let dir = tempfile::tempdir().unwrap();
    let session = Arc::new(MemorySession::new());

    let mut records: Vec<SourceRecord> = Vec::new();
    records.extend((0..100).map(quote_record));
    // Trade record 37 carries an unparseable date and fails its mapper
    records.extend((0..100).map(|i| trade_record(i, i == 37)));
    records.extend((0..100).map(|i| {
        SourceRecord::BondFutureQuote(BondFutureQuoteSource {
            symbol: Some(format!("T25{:02}", i % 4)),
            trade_date: Some("2025.01.02".to_string()),
            receive_time: Some(common::datetime(i as i64)),
            ..Default::default()
        })
    }));

    let application = build(records, session.clone(), &dir);
    let result = application.run(range("20250101", "20250101")).await.unwrap();

    assert_eq!(result.failed_days(), 1);
    let day = result.per_day.values().next().unwrap();
    assert!(!day.success);
    assert_eq!(day.failed_phase, Some(Phase::Transform));
    let failure = day.failure.as_ref().unwrap();
    assert!(failure.contains("XbondTrade"));
    assert!(failure.contains("37"));

    // Load never ran: no staging tables were created, nothing transformed
    assert!(session.table_names().is_empty());
    assert_eq!(day.snapshot.transformed_records, None);
    assert_eq!(day.snapshot.transformed_count, None);
    let phases: Vec<Phase> = day.per_phase.iter().map(|r| r.phase).collect();
    assert_eq!(phases, vec![Phase::Extract, Phase::Transform]);
}

#[tokio::test]
async fn test_null_sort_key_records_dropped_and_validation_passes() {
    let dir = tempfile::tempdir().unwrap();
    let session = Arc::new(MemorySession::new());

    let mut records: Vec<SourceRecord> = (0..995).map(quote_record).collect();
    records.extend((0..5).map(null_key_quote_record));
    let application = build(records, session, &dir);

    let result = application.run(range("20250101", "20250101")).await.unwrap();

    assert_eq!(result.successful_days(), 1);
    let day = result.per_day.values().next().unwrap();
    assert_eq!(day.snapshot.extracted_count, Some(1000));
    assert_eq!(day.snapshot.transformed_count, Some(1000));
    // The five null-key records never reached the staging table
    assert_eq!(day.snapshot.loaded_count, Some(995));
    assert_eq!(day.snapshot.validation_passed, Some(true));
    assert_eq!(
        day.snapshot.attributes.get(attribute_keys::DROPPED_NULL_SORT_KEY),
        Some(&serde_json::json!(5))
    );
}

#[tokio::test]
async fn test_external_sort_produces_identical_load_order() {
    let records: Vec<SourceRecord> = (0..400).map(quote_record).collect();

    // Baseline: everything fits in memory
    let dir_a = tempfile::tempdir().unwrap();
    let inner_a = Arc::new(MemorySession::new());
    let session_a = RecordingSession::new(inner_a);
    let application = EtlApplication::build_with(
        test_config(),
        vec![FixtureExtractor::new(records.clone())],
        session_a.clone(),
        lock_path(&dir_a),
    )
    .unwrap();
    application.run(range("20250101", "20250101")).await.unwrap();

    // Tiny budget plus an inflated estimate forces the external path
    let dir_b = tempfile::tempdir().unwrap();
    let inner_b = Arc::new(MemorySession::new());
    let session_b = RecordingSession::new(inner_b);
    let mut config = test_config();
    config.loader.max_sort_memory = SortMemoryLimit::from_mb(1).unwrap();
    config.loader.record_bytes_estimate = 64 * 1024;
    let application = EtlApplication::build_with(
        config,
        vec![FixtureExtractor::new(records)],
        session_b.clone(),
        lock_path(&dir_b),
    )
    .unwrap();
    application.run(range("20250101", "20250101")).await.unwrap();

    // Same tables, same column arrays, same row order. Compared through JSON
    // so NaN sentinels (null once serialized) compare equal.
    assert_eq!(
        serde_json::to_value(session_a.normalized_inserts()).unwrap(),
        serde_json::to_value(session_b.normalized_inserts()).unwrap()
    );
}

#[tokio::test]
async fn test_second_instance_rejected_while_first_holds_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = lock_path(&dir);
    let _held = SingleInstanceLock::try_acquire(&path).unwrap();

    let session = Arc::new(MemorySession::new());
    let application = EtlApplication::build_with(
        test_config(),
        vec![FixtureExtractor::new(vec![quote_record(0)])],
        session,
        path.clone(),
    )
    .unwrap();

    let err = application.run(range("20250101", "20250101")).await.unwrap_err();
    assert_eq!(err.category(), "concurrency");
    assert!(err.to_string().contains(path.display().to_string().as_str()));
}

#[tokio::test]
async fn test_empty_extraction_completes_the_day() {
    let dir = tempfile::tempdir().unwrap();
    let session = Arc::new(MemorySession::new());
    let application = build(Vec::new(), session.clone(), &dir);

    let result = application.run(range("20250101", "20250101")).await.unwrap();
    assert_eq!(result.successful_days(), 1);
    let day = result.per_day.values().next().unwrap();
    assert_eq!(day.snapshot.extracted_count, Some(0));
    assert_eq!(day.snapshot.loaded_count, Some(0));
    assert_eq!(day.snapshot.cleanup_done, Some(true));
    assert!(session.table_names().is_empty());
}

#[tokio::test]
async fn test_mixed_types_land_in_their_own_staging_tables() {
    let dir = tempfile::tempdir().unwrap();
    let session = Arc::new(MemorySession::new());

    let mut records: Vec<SourceRecord> = (0..10).map(quote_record).collect();
    records.extend((0..20).map(|i| trade_record(i, false)));
    let application = build(records, session.clone(), &dir);

    // Peek at the staging layout by failing validation? No: run to completion
    // and assert through the per-day snapshot instead.
    let result = application.run(range("20250101", "20250101")).await.unwrap();
    let day = result.per_day.values().next().unwrap();
    assert!(day.success);
    assert_eq!(day.snapshot.loaded_count, Some(30));

    let plan = day
        .snapshot
        .attributes
        .get(attribute_keys::STAGING_PLAN)
        .and_then(|v| v.as_array())
        .unwrap();
    assert_eq!(plan.len(), 2);
    let rows: Vec<u64> = plan.iter().map(|p| p["rows"].as_u64().unwrap()).collect();
    assert_eq!(rows, vec![10, 20]);
}
