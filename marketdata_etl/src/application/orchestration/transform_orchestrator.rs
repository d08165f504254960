// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transform Orchestrator
//!
//! Fans the extracted records out to type-dispatched transformers and
//! consolidates the results. This is the only parallel section of the engine:
//! record-type groups run concurrently on a dedicated rayon pool sized
//! `min(groups, 3)`, hosted inside `spawn_blocking` because the mapping work
//! is CPU-bound.
//!
//! Failure is fail-fast and all-or-nothing: the first failing group sets the
//! shared cancel flag, peers abandon at their next per-record check, and the
//! day fails with the failing group's error. The context is written only when
//! every group succeeds, so a failed Transform leaves `transformed_data`
//! unset.
//!
//! Consolidation is deterministic: groups concatenate in alphabetical
//! source-type order. Worker tasks never touch the context; they hand their
//! batches back and the orchestrator writes from the main task after the
//! join.

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use marketdata_etl_domain::services::transformer::TransformBatch;
use marketdata_etl_domain::{
    CancelFlag, EtlContext, EtlError, SourceRecord, Transformer, TransformerRegistry,
    UnmappedFieldPolicy,
};

/// Upper bound on concurrent transform workers, one per record type.
pub const MAX_TRANSFORM_WORKERS: usize = 3;

/// Parallel, fail-fast transformation coordinator.
pub struct TransformOrchestrator {
    registry: Arc<TransformerRegistry>,
    policies: BTreeMap<String, UnmappedFieldPolicy>,
    max_workers: usize,
}

impl TransformOrchestrator {
    pub fn new(registry: Arc<TransformerRegistry>, policies: BTreeMap<String, UnmappedFieldPolicy>) -> Self {
        Self {
            registry,
            policies,
            max_workers: MAX_TRANSFORM_WORKERS,
        }
    }

    /// Transforms `ctx.extracted_data` into `ctx.transformed_data`.
    pub async fn execute(&self, ctx: &mut EtlContext) -> Result<(), EtlError> {
        let extracted = ctx.extracted_data().unwrap_or_default();
        if extracted.is_empty() {
            info!(date = %ctx.current_date(), "nothing extracted; transform is an empty success");
            ctx.set_transformed_data(Vec::new());
            ctx.set_transformed_count(0);
            return Ok(());
        }

        // Partition by concrete source type; BTreeMap keys give the
        // deterministic alphabetical consolidation order
        let mut groups: BTreeMap<String, Vec<SourceRecord>> = BTreeMap::new();
        for record in extracted {
            groups
                .entry(record.type_name().to_string())
                .or_default()
                .push(record.clone());
        }

        let mut jobs: Vec<(String, Arc<dyn Transformer>, Vec<SourceRecord>)> = Vec::with_capacity(groups.len());
        for (type_name, records) in groups {
            let transformer = self.registry.lookup(&type_name).ok_or_else(|| {
                EtlError::invalid_config(format!("no transformer registered for source type {}", type_name))
            })?;
            jobs.push((type_name, transformer, records));
        }

        let worker_count = jobs.len().min(self.max_workers);
        debug!(groups = jobs.len(), workers = worker_count, "transform fan-out");

        let cancel = CancelFlag::new();
        let pool_cancel = cancel.clone();
        let results: Vec<(String, Result<TransformBatch, EtlError>)> =
            tokio::task::spawn_blocking(move || {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(worker_count)
                    .build()
                    .map_err(|e| EtlError::internal_error(format!("transform pool: {}", e)))?;
                Ok::<_, EtlError>(pool.install(|| {
                    jobs.into_par_iter()
                        .map(|(type_name, transformer, records)| {
                            if pool_cancel.is_cancelled() {
                                return (
                                    type_name,
                                    Err(EtlError::cancelled("peer transformer failed")),
                                );
                            }
                            let result = transformer.transform(&records, &pool_cancel);
                            if result.is_err() {
                                pool_cancel.cancel();
                            }
                            (type_name, result)
                        })
                        .collect()
                }))
            })
            .await
            .map_err(|e| EtlError::internal_error(format!("transform task join: {}", e)))??;

        // The first real failure wins; Cancelled entries are stopped peers
        let mut batches: BTreeMap<String, TransformBatch> = BTreeMap::new();
        let mut failure: Option<EtlError> = None;
        let mut cancelled: Option<EtlError> = None;
        for (type_name, result) in results {
            match result {
                Ok(batch) => {
                    batches.insert(type_name, batch);
                }
                Err(err @ EtlError::Cancelled(_)) => cancelled = Some(err),
                Err(err) => {
                    if failure.is_none() {
                        failure = Some(wrap_group_failure(&type_name, err));
                    }
                }
            }
        }
        if let Some(err) = failure.or(cancelled) {
            return Err(err);
        }

        let mut transformed = Vec::new();
        for (type_name, batch) in batches {
            self.log_stats(&type_name, &batch);
            transformed.extend(batch.records);
        }
        info!(date = %ctx.current_date(), records = transformed.len(), "transformation consolidated");
        ctx.set_transformed_count(transformed.len() as u64);
        ctx.set_transformed_data(transformed);
        Ok(())
    }

    fn log_stats(&self, type_name: &str, batch: &TransformBatch) {
        for (field, count) in &batch.stats.incompatible {
            warn!(source_type = type_name, field = %field, count, "type-incompatible field skipped");
        }
        let policy = self.policies.get(type_name).copied().unwrap_or_default();
        for (field, count) in &batch.stats.source_only {
            match policy {
                UnmappedFieldPolicy::Warn => {
                    warn!(source_type = type_name, field = %field, count, "source field has no target counterpart");
                }
                UnmappedFieldPolicy::Drop => {
                    debug!(source_type = type_name, field = %field, count, "source field has no target counterpart");
                }
            }
        }
    }
}

fn wrap_group_failure(type_name: &str, err: EtlError) -> EtlError {
    match err {
        already @ EtlError::Transformation { .. } => already,
        other => EtlError::transformation(type_name, 0, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketdata_etl_domain::records::{
        BondFutureQuoteSource, XbondQuoteSource, XbondTradeSource,
    };
    use marketdata_etl_domain::services::transformer::Transformer;
    use marketdata_etl_domain::{TradeDate, TransformBatch};

    fn context_with(records: Vec<SourceRecord>) -> EtlContext {
        let mut ctx = EtlContext::new(TradeDate::parse("20250101").unwrap());
        let count = records.len() as u64;
        ctx.set_current_phase(marketdata_etl_domain::Phase::Extract).unwrap();
        ctx.set_extracted_data(records);
        ctx.set_extracted_count(count);
        ctx
    }

    fn orchestrator() -> TransformOrchestrator {
        TransformOrchestrator::new(Arc::new(TransformerRegistry::standard()), BTreeMap::new())
    }

    fn mixed_records(per_type: usize) -> Vec<SourceRecord> {
        let mut records = Vec::new();
        for i in 0..per_type {
            records.push(SourceRecord::XbondTrade(XbondTradeSource {
                symbol: Some(format!("T{}", i)),
                ..Default::default()
            }));
            records.push(SourceRecord::XbondQuote(XbondQuoteSource {
                symbol: Some(format!("Q{}", i)),
                ..Default::default()
            }));
            records.push(SourceRecord::BondFutureQuote(BondFutureQuoteSource {
                symbol: Some(format!("F{}", i)),
                ..Default::default()
            }));
        }
        records
    }

    #[tokio::test]
    async fn test_consolidates_in_alphabetical_type_order() {
        let mut ctx = context_with(mixed_records(2));
        orchestrator().execute(&mut ctx).await.unwrap();

        let transformed = ctx.transformed_data().unwrap();
        assert_eq!(transformed.len(), 6);
        assert_eq!(ctx.transformed_count(), Some(6));
        let type_order: Vec<_> = transformed.iter().map(|r| r.type_name()).collect();
        assert_eq!(
            type_order,
            vec![
                "BondFutureQuote",
                "BondFutureQuote",
                "XbondQuote",
                "XbondQuote",
                "XbondTrade",
                "XbondTrade"
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_extraction_is_empty_success() {
        let mut ctx = context_with(Vec::new());
        orchestrator().execute(&mut ctx).await.unwrap();
        assert_eq!(ctx.transformed_count(), Some(0));
        assert!(ctx.transformed_data().unwrap().is_empty());
    }

    struct FailingTransformer;

    impl Transformer for FailingTransformer {
        fn source_type(&self) -> &'static str {
            "XbondTrade"
        }

        fn target_type(&self) -> &'static str {
            "XbondTrade"
        }

        fn transform(
            &self,
            _records: &[SourceRecord],
            _cancel: &CancelFlag,
        ) -> Result<TransformBatch, EtlError> {
            Err(EtlError::transformation(
                "XbondTrade",
                37,
                EtlError::internal_error("boom on record 37"),
            ))
        }
    }

    #[tokio::test]
    async fn test_fail_fast_leaves_context_unwritten() {
        let mut registry = TransformerRegistry::standard();
        registry.register(Arc::new(FailingTransformer));
        let orchestrator =
            TransformOrchestrator::new(Arc::new(registry), BTreeMap::new());

        let mut ctx = context_with(mixed_records(3));
        let err = orchestrator.execute(&mut ctx).await.unwrap_err();

        match err {
            EtlError::Transformation {
                source_type,
                records_processed,
                ..
            } => {
                assert_eq!(source_type, "XbondTrade");
                assert_eq!(records_processed, 37);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(ctx.transformed_data().is_none());
        assert!(ctx.transformed_count().is_none());
    }

    #[tokio::test]
    async fn test_unregistered_type_is_config_error() {
        let orchestrator =
            TransformOrchestrator::new(Arc::new(TransformerRegistry::new()), BTreeMap::new());
        let mut ctx = context_with(mixed_records(1));
        let err = orchestrator.execute(&mut ctx).await.unwrap_err();
        assert_eq!(err.category(), "configuration");
    }
}
