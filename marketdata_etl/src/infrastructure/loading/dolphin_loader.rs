// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # DolphinDB Loader
//!
//! `Loader` implementation driving the staged bulk-load sequence against the
//! session port:
//!
//! 1. `sort_data` drops records with a null in any configured sort key (WARN
//!    with the count) and runs the memory-bounded stable sort off the async
//!    runtime.
//! 2. `load_data` partitions by target type, converts each partition to
//!    column arrays in declared order, and bulk-inserts partition by
//!    partition — **sequentially**, in configured mapping order, so a
//!    mid-load failure leaves every earlier partition fully staged for
//!    forensics.
//!
//! Staging tables are created and dropped by the load/clean subprocesses;
//! the loader only inserts into them, which keeps it target-agnostic. A DB
//! failure surfaces as `EtlError::Loading` naming the staging table and the
//! rows already inserted into earlier partitions.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::infrastructure::config::LoaderConfig;
use crate::infrastructure::loading::column_converter::ColumnConverter;
use crate::infrastructure::loading::staging::staging_table_name;
use crate::infrastructure::sorting::ExternalSorter;
use marketdata_etl_domain::{
    DbSession, EtlError, Loader, LoadReport, PartitionLoad, RunId, SortOutcome, TargetRecord,
};

/// Staged columnar loader over an opaque DB session.
pub struct DolphinLoader {
    session: Arc<dyn DbSession>,
    config: LoaderConfig,
    run_id: RunId,
    sorter: ExternalSorter,
}

impl DolphinLoader {
    pub fn new(session: Arc<dyn DbSession>, config: LoaderConfig, run_id: RunId) -> Self {
        let sorter = ExternalSorter::new(
            config.sort_fields.clone(),
            config.max_sort_memory,
            config.record_bytes_estimate,
        );
        Self {
            session,
            config,
            run_id,
            sorter,
        }
    }

    /// Splits records into null-key drops and sortable keeps. An unknown sort
    /// field fails here, before anything reaches the database.
    fn partition_null_keys(
        &self,
        records: Vec<TargetRecord>,
    ) -> Result<(Vec<TargetRecord>, u64), EtlError> {
        let mut kept = Vec::with_capacity(records.len());
        let mut dropped = 0u64;
        for record in records {
            let mut has_null_key = false;
            for field in &self.config.sort_fields {
                let value = record.sort_value(field).ok_or_else(|| {
                    EtlError::invalid_config(format!(
                        "sort field '{}' is not declared by target type {}",
                        field,
                        record.type_name()
                    ))
                })?;
                if value.is_null() {
                    has_null_key = true;
                    break;
                }
            }
            if has_null_key {
                dropped += 1;
            } else {
                kept.push(record);
            }
        }
        Ok((kept, dropped))
    }
}

#[async_trait]
impl Loader for DolphinLoader {
    async fn init(&self) -> Result<(), EtlError> {
        self.session.run_script("1 + 1").await.map_err(|cause| {
            EtlError::database_error(format!(
                "cannot reach target database at {}: {}",
                self.config.masked_connection(),
                cause
            ))
        })
    }

    async fn sort_data(&self, records: Vec<TargetRecord>) -> Result<SortOutcome, EtlError> {
        let (kept, dropped_null_key) = self.partition_null_keys(records)?;
        if dropped_null_key > 0 {
            warn!(
                dropped = dropped_null_key,
                sort_fields = ?self.config.sort_fields,
                "dropped records with null sort key"
            );
        }

        let sorter = self.sorter.clone();
        let records = tokio::task::spawn_blocking(move || sorter.sort(kept))
            .await
            .map_err(|e| EtlError::internal_error(format!("sort task failed: {}", e)))??;

        Ok(SortOutcome {
            records,
            dropped_null_key,
        })
    }

    async fn load_data(&self, sorted: Vec<TargetRecord>) -> Result<LoadReport, EtlError> {
        // Partition by type; within a partition, post-sort order is preserved
        let mut partitions: BTreeMap<&'static str, Vec<TargetRecord>> = BTreeMap::new();
        for record in sorted {
            partitions.entry(record.type_name()).or_default().push(record);
        }
        for data_type in partitions.keys() {
            if self.config.table_for(data_type).is_none() {
                return Err(EtlError::invalid_config(format!(
                    "no target table mapping for data type {}",
                    data_type
                )));
            }
        }

        let mut report = LoadReport::default();
        let mut inserted_before = 0u64;
        // Sequential, in configured mapping order
        for mapping in &self.config.table_mappings {
            let Some(records) = partitions.remove(mapping.data_type.as_str()) else {
                continue;
            };
            let staging_table =
                staging_table_name(&self.config.temporary_table_prefix, &mapping.table_name, &self.run_id);
            let columns = ColumnConverter::to_columns(&records)?;
            let expected = records.len() as u64;
            if columns.iter().any(|c| c.values.len() as u64 != expected) {
                return Err(EtlError::internal_error(format!(
                    "column-array length mismatch for partition {}",
                    mapping.data_type
                )));
            }

            let rows = self
                .session
                .table_insert(&staging_table, &columns)
                .await
                .map_err(|cause| EtlError::loading(staging_table.clone(), inserted_before, cause))?;
            if rows != expected {
                return Err(EtlError::loading(
                    staging_table.clone(),
                    inserted_before,
                    EtlError::database_error(format!(
                        "bulk insert reported {} rows for a partition of {}",
                        rows, expected
                    )),
                ));
            }

            info!(
                partition = mapping.data_type,
                staging_table = %staging_table,
                rows,
                "partition staged"
            );
            inserted_before += rows;
            report.partitions.push(PartitionLoad {
                data_type: mapping.data_type.clone(),
                target_table: mapping.table_name.clone(),
                staging_table,
                rows,
            });
        }

        Ok(report)
    }

    async fn shutdown(&self) -> Result<(), EtlError> {
        self.session.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::TableMapping;
    use crate::infrastructure::loading::memory_session::MemorySession;
    use crate::infrastructure::loading::staging::{create_script, plan_for_types};
    use chrono::{TimeZone, Utc};
    use marketdata_etl_domain::records::{XbondQuoteTarget, XbondTradeTarget};
    use marketdata_etl_domain::SortMemoryLimit;
    use std::collections::BTreeSet;

    fn loader_config() -> LoaderConfig {
        LoaderConfig {
            connection_url: "mem://local".to_string(),
            username: "etl".to_string(),
            password: "secret".to_string(),
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
            ],
        }
    }

    fn quote(symbol: &str, seconds: Option<i64>) -> TargetRecord {
        TargetRecord::XbondQuote(XbondQuoteTarget {
            symbol: Some(symbol.to_string()),
            receive_time: seconds
                .map(|s| Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap() + chrono::Duration::seconds(s)),
            ..Default::default()
        })
    }

    fn trade(symbol: &str, seconds: i64) -> TargetRecord {
        TargetRecord::XbondTrade(XbondTradeTarget {
            symbol: Some(symbol.to_string()),
            receive_time: Some(Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap() + chrono::Duration::seconds(seconds)),
            ..Default::default()
        })
    }

    async fn loader_with_staging(records: &[TargetRecord]) -> (DolphinLoader, Arc<MemorySession>) {
        let session = Arc::new(MemorySession::new());
        let run_id = RunId::new();
        let config = loader_config();
        let present: BTreeSet<&str> = records.iter().map(|r| r.type_name()).collect();
        let plan = plan_for_types(&config, &run_id, &present);
        session.run_script(&create_script(&plan)).await.unwrap();
        (DolphinLoader::new(session.clone(), config, run_id), session)
    }

    #[tokio::test]
    async fn test_sort_drops_null_key_records() {
        let records = vec![
            quote("A", Some(10)),
            quote("B", None),
            quote("C", Some(5)),
            quote("D", None),
        ];
        let (loader, _session) = loader_with_staging(&records).await;
        let outcome = loader.sort_data(records).await.unwrap();
        assert_eq!(outcome.dropped_null_key, 2);
        assert_eq!(outcome.records.len(), 2);
        // Sorted by receive_time
        match &outcome.records[0] {
            TargetRecord::XbondQuote(q) => assert_eq!(q.symbol.as_deref(), Some("C")),
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_partitions_sequentially_in_mapping_order() {
        let records = vec![trade("T1", 3), quote("Q1", Some(1)), trade("T2", 2), quote("Q2", Some(4))];
        let (loader, session) = loader_with_staging(&records).await;
        let sorted = loader.sort_data(records).await.unwrap();
        let report = loader.load_data(sorted.records).await.unwrap();

        assert_eq!(report.total_rows(), 4);
        assert_eq!(report.partitions.len(), 2);
        // Config mapping order: quotes before trades
        assert_eq!(report.partitions[0].data_type, "XbondQuote");
        assert_eq!(report.partitions[1].data_type, "XbondTrade");
        for partition in &report.partitions {
            assert_eq!(session.rows_in(&partition.staging_table), Some(partition.rows));
            assert_eq!(partition.rows, 2);
        }
    }

    #[tokio::test]
    async fn test_unmapped_partition_type_fails_before_insert() {
        let records = vec![TargetRecord::BondFutureQuote(Default::default())];
        let (loader, session) = loader_with_staging(&[]).await;
        let err = loader.load_data(records).await.unwrap_err();
        assert_eq!(err.category(), "configuration");
        assert!(session.table_names().is_empty());
    }

    #[tokio::test]
    async fn test_failed_insert_names_staging_table() {
        // No staging tables created: the insert itself fails
        let session = Arc::new(MemorySession::new());
        let loader = DolphinLoader::new(session, loader_config(), RunId::new());
        let err = loader.load_data(vec![quote("A", Some(1))]).await.unwrap_err();
        match err {
            EtlError::Loading {
                staging_table,
                records_inserted,
                ..
            } => {
                assert!(staging_table.starts_with("tmp_xbond_quote_"));
                assert_eq!(records_inserted, 0);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_init_masks_credentials_on_failure() {
        let session = Arc::new(MemorySession::new());
        session.close().await.unwrap();
        let loader = DolphinLoader::new(session, loader_config(), RunId::new());
        let message = loader.init().await.unwrap_err().to_string();
        assert!(message.contains("mem://local"));
        assert!(message.contains("user=etl"));
        assert!(!message.contains("secret"));
    }
}
