// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Common Test Helpers
//!
//! Shared fixtures for the end-to-end workflow tests: an in-memory extractor,
//! session wrappers with failure injection and insert recording, and a
//! ready-made configuration.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use marketdata_etl::infrastructure::config::{
    EtlConfig, LoaderConfig, SourceConfig, TableMapping, TargetConfig, ValidationConfig,
};
use marketdata_etl::infrastructure::loading::MemorySession;
use marketdata_etl_domain::records::{XbondQuoteSource, XbondTradeSource};
use marketdata_etl_domain::{
    Column, DbSession, EtlError, Extractor, SortMemoryLimit, SourceRecord, TradeDate,
};

/// Configuration matching the standard three-type fixture world.
pub fn test_config() -> EtlConfig {
    EtlConfig {
        sources: vec![SourceConfig {
            name: "fixture_feed".to_string(),
            source_type: "jsonl".to_string(),
            connection_string: "unused".to_string(),
            primary_key_field: None,
            credentials: Default::default(),
        }],
        targets: vec![TargetConfig {
            name: "dolphin".to_string(),
            target_type: "dolphindb".to_string(),
            connection_string: "mem://local".to_string(),
            batch_size: None,
            data_type: None,
        }],
        transforms: Vec::new(),
        validation: ValidationConfig::default(),
        loader: LoaderConfig {
            connection_url: "mem://local".to_string(),
            username: String::new(),
            password: String::new(),
            sort_fields: vec!["receive_time".to_string(), "symbol".to_string()],
            max_sort_memory: SortMemoryLimit::default(),
            record_bytes_estimate: 500,
            temporary_table_prefix: "tmp_".to_string(),
            table_mappings: vec![
                TableMapping {
                    data_type: "XbondQuote".to_string(),
                    table_name: "xbond_quote".to_string(),
                },
                TableMapping {
                    data_type: "XbondTrade".to_string(),
                    table_name: "xbond_trade".to_string(),
                },
                TableMapping {
                    data_type: "BondFutureQuote".to_string(),
                    table_name: "bond_future_quote".to_string(),
                },
            ],
        },
        logging: Default::default(),
    }
}

pub fn datetime(seconds: i64) -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2025-01-02T09:00:00", "%Y-%m-%dT%H:%M:%S").unwrap()
        + chrono::Duration::seconds(seconds)
}

/// A quote record with a valid date and a set receive time.
pub fn quote_record(index: usize) -> SourceRecord {
    SourceRecord::XbondQuote(XbondQuoteSource {
        symbol: Some(format!("24{:04}.IB", index % 7)),
        trade_date: Some("2025.01.02".to_string()),
        bid_price: Some(100.0 + index as f64 / 100.0),
        bid_volume: Some(10_000_000),
        receive_time: Some(datetime((index as i64 * 37) % 900)),
        ..Default::default()
    })
}

/// A quote record whose receive time (the primary sort key) is null.
pub fn null_key_quote_record(index: usize) -> SourceRecord {
    match quote_record(index) {
        SourceRecord::XbondQuote(mut quote) => {
            quote.receive_time = None;
            SourceRecord::XbondQuote(quote)
        }
        other => other,
    }
}

/// A trade record; pass `malformed_date` to make its transformation fail.
pub fn trade_record(index: usize, malformed_date: bool) -> SourceRecord {
    SourceRecord::XbondTrade(XbondTradeSource {
        symbol: Some(format!("23{:04}.IB", index % 5)),
        trade_date: Some(if malformed_date {
            "02/01/2025".to_string()
        } else {
            "2025.01.02".to_string()
        }),
        side: Some(if index % 2 == 0 { "B" } else { "S" }.to_string()),
        receive_time: Some(datetime((index as i64 * 13) % 900)),
        ..Default::default()
    })
}

/// Extractor returning the same fixed record set for every date.
pub struct FixtureExtractor {
    name: String,
    records: Vec<SourceRecord>,
}

impl FixtureExtractor {
    pub fn new(records: Vec<SourceRecord>) -> Arc<dyn Extractor> {
        Arc::new(Self {
            name: "fixture_feed".to_string(),
            records,
        })
    }
}

#[async_trait]
impl Extractor for FixtureExtractor {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, _date: TradeDate) -> Result<Vec<SourceRecord>, EtlError> {
        Ok(self.records.clone())
    }
}

/// Session wrapper rejecting the N-th insert into tables whose name contains
/// a marker, emulating a mid-run database failure.
#[derive(Debug)]
pub struct FlakySession {
    pub inner: Arc<MemorySession>,
    marker: String,
    fail_on_call: u64,
    calls: AtomicU64,
}

impl FlakySession {
    pub fn new(inner: Arc<MemorySession>, marker: &str, fail_on_call: u64) -> Arc<Self> {
        Arc::new(Self {
            inner,
            marker: marker.to_string(),
            fail_on_call,
            calls: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl DbSession for FlakySession {
    async fn run_script(&self, script: &str) -> Result<(), EtlError> {
        self.inner.run_script(script).await
    }

    async fn table_insert(&self, table: &str, columns: &[Column]) -> Result<u64, EtlError> {
        if table.contains(&self.marker) {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on_call {
                return Err(EtlError::database_error(format!(
                    "insert into {} rejected by server",
                    table
                )));
            }
        }
        self.inner.table_insert(table, columns).await
    }

    async fn table_row_count(&self, table: &str) -> Result<u64, EtlError> {
        self.inner.table_row_count(table).await
    }

    async fn close(&self) -> Result<(), EtlError> {
        self.inner.close().await
    }
}

/// Session wrapper recording every bulk-insert payload, for order-equality
/// assertions.
#[derive(Debug)]
pub struct RecordingSession {
    pub inner: Arc<MemorySession>,
    pub inserts: Mutex<Vec<(String, Vec<Column>)>>,
}

impl RecordingSession {
    pub fn new(inner: Arc<MemorySession>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            inserts: Mutex::new(Vec::new()),
        })
    }

    /// The recorded payloads with the run-specific staging suffix stripped,
    /// so two runs compare structurally.
    pub fn normalized_inserts(&self) -> Vec<(String, Vec<Column>)> {
        self.inserts
            .lock()
            .unwrap()
            .iter()
            .map(|(table, columns)| {
                let base = table.rsplit_once('_').map(|(b, _)| b.to_string()).unwrap_or_else(|| table.clone());
                (base, columns.clone())
            })
            .collect()
    }
}

#[async_trait]
impl DbSession for RecordingSession {
    async fn run_script(&self, script: &str) -> Result<(), EtlError> {
        self.inner.run_script(script).await
    }

    async fn table_insert(&self, table: &str, columns: &[Column]) -> Result<u64, EtlError> {
        self.inserts
            .lock()
            .unwrap()
            .push((table.to_string(), columns.to_vec()));
        self.inner.table_insert(table, columns).await
    }

    async fn table_row_count(&self, table: &str) -> Result<u64, EtlError> {
        self.inner.table_row_count(table).await
    }

    async fn close(&self) -> Result<(), EtlError> {
        self.inner.close().await
    }
}
