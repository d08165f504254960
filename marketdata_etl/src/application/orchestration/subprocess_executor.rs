// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Subprocess Executor
//!
//! Runs a day's subprocesses in declared order against one context. Around
//! every phase it:
//!
//! 1. validates the phase's preconditions against the context and the
//!    configuration,
//! 2. advances the context's phase machine,
//! 3. invokes the subprocess,
//! 4. records a `SubprocessResult` and emits the status log line.
//!
//! Any failure — precondition violation, illegal transition, or subprocess
//! error — wraps into `EtlError::PhaseFailure` with the phase and date, marks
//! the context failed, logs the context snapshot, and aborts the remaining
//! phases. There is no retry.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

use crate::infrastructure::config::EtlConfig;
use marketdata_etl_domain::{EtlContext, EtlError, Phase, Subprocess, SubprocessResult};

/// What `execute_all` observed: every phase result recorded before the stop,
/// plus the wrapped failure if one occurred.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub per_phase: Vec<SubprocessResult>,
    pub failure: Option<EtlError>,
}

/// Sequential phase runner.
pub struct SubprocessExecutor {
    config: Arc<EtlConfig>,
}

impl SubprocessExecutor {
    pub fn new(config: Arc<EtlConfig>) -> Self {
        Self { config }
    }

    /// Runs the subprocesses in order, stopping at the first failure. When
    /// the full canonical pipeline succeeds the context ends in `Complete`.
    pub async fn execute_all(
        &self,
        ctx: &mut EtlContext,
        subprocesses: &[Arc<dyn Subprocess>],
    ) -> ExecutionOutcome {
        let mut per_phase = Vec::with_capacity(subprocesses.len());

        for subprocess in subprocesses {
            let phase = subprocess.phase();
            let started_at = Utc::now();
            let timer = std::time::Instant::now();

            let result = match self.validate_preconditions(ctx, phase) {
                Err(err) => Err(err),
                Ok(()) => match ctx.set_current_phase(phase) {
                    Err(err) => Err(err),
                    Ok(()) => subprocess.execute(ctx).await,
                },
            };
            let duration_ms = timer.elapsed().as_millis() as u64;

            match result {
                Ok(()) => {
                    let record_count = phase_count(ctx, phase);
                    info!(
                        phase = %phase,
                        date = %ctx.current_date(),
                        records = record_count,
                        duration_ms,
                        "phase complete"
                    );
                    per_phase.push(SubprocessResult {
                        phase,
                        success: true,
                        record_count,
                        started_at,
                        duration_ms,
                    });
                }
                Err(cause) => {
                    let date = ctx.current_date();
                    let failure = EtlError::phase_failure(phase, date, cause);
                    let _ = ctx.fail();
                    error!(
                        phase = %phase,
                        date = %date,
                        error = %failure,
                        snapshot = ?ctx.snapshot(),
                        "phase failed"
                    );
                    per_phase.push(SubprocessResult {
                        phase,
                        success: false,
                        record_count: 0,
                        started_at,
                        duration_ms,
                    });
                    return ExecutionOutcome {
                        per_phase,
                        failure: Some(failure),
                    };
                }
            }
        }

        // Only the full canonical chain reaches the terminal state
        if ctx.current_phase() == Phase::Clean {
            if let Err(err) = ctx.set_current_phase(Phase::Complete) {
                return ExecutionOutcome {
                    per_phase,
                    failure: Some(err),
                };
            }
        }
        ExecutionOutcome {
            per_phase,
            failure: None,
        }
    }

    /// The phase entry contract, checked before the phase runs.
    fn validate_preconditions(&self, ctx: &EtlContext, phase: Phase) -> Result<(), EtlError> {
        let violation = |reason: &str| {
            Err(EtlError::PreconditionViolation {
                phase,
                reason: reason.to_string(),
            })
        };
        match phase {
            Phase::Extract => {
                if self.config.sources.is_empty() {
                    return violation("no sources configured");
                }
            }
            Phase::Transform => {
                if ctx.current_phase() != Phase::Extract {
                    return violation("previous phase is not Extract");
                }
                if ctx.extracted_data().is_none() {
                    return violation("extracted data is not set");
                }
            }
            Phase::Load => {
                if ctx.transformed_data().is_none() {
                    return violation("transformed data is not set");
                }
                if self.config.targets.is_empty() {
                    return violation("no targets configured");
                }
            }
            Phase::Validate => {
                if ctx.loaded_count().is_none() {
                    return violation("loaded count is not set");
                }
            }
            Phase::Clean => {
                if ctx.validation_passed().is_none() {
                    return violation("validation verdict is not set");
                }
            }
            other => return violation(&format!("{} is not an executable phase", other)),
        }
        Ok(())
    }
}

/// Phase-relevant count recorded in the subprocess result.
fn phase_count(ctx: &EtlContext, phase: Phase) -> u64 {
    match phase {
        Phase::Extract => ctx.extracted_count().unwrap_or(0),
        Phase::Transform => ctx.transformed_count().unwrap_or(0),
        Phase::Load | Phase::Validate => ctx.loaded_count().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::infrastructure::config::{
        LoaderConfig, SourceConfig, TableMapping, TargetConfig, ValidationConfig,
    };
    use async_trait::async_trait;
    use marketdata_etl_domain::{SortMemoryLimit, TradeDate};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn test_config(sources: usize, targets: usize) -> EtlConfig {
        EtlConfig {
            sources: (0..sources)
                .map(|i| SourceConfig {
                    name: format!("source_{}", i),
                    source_type: "jsonl".to_string(),
                    connection_string: format!("data/source_{}.jsonl", i),
                    primary_key_field: None,
                    credentials: Default::default(),
                })
                .collect(),
            targets: (0..targets)
                .map(|i| TargetConfig {
                    name: format!("target_{}", i),
                    target_type: "dolphindb".to_string(),
                    connection_string: "mem://local".to_string(),
                    batch_size: None,
                    data_type: None,
                })
                .collect(),
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

    struct StubSubprocess {
        phase: Phase,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl StubSubprocess {
        fn ok(phase: Phase, calls: Arc<AtomicUsize>) -> Arc<dyn Subprocess> {
            Arc::new(Self {
                phase,
                fail: false,
                calls,
            })
        }

        fn failing(phase: Phase, calls: Arc<AtomicUsize>) -> Arc<dyn Subprocess> {
            Arc::new(Self {
                phase,
                fail: true,
                calls,
            })
        }
    }

    #[async_trait]
    impl Subprocess for StubSubprocess {
        fn phase(&self) -> Phase {
            self.phase
        }

        async fn execute(&self, ctx: &mut EtlContext) -> Result<(), EtlError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EtlError::internal_error("stub failure"));
            }
            // Produce just enough state for the next phase's preconditions
            match self.phase {
                Phase::Extract => {
                    ctx.set_extracted_data(Vec::new());
                    ctx.set_extracted_count(0);
                }
                Phase::Transform => {
                    ctx.set_transformed_data(Vec::new());
                    ctx.set_transformed_count(0);
                }
                Phase::Load => ctx.set_loaded_count(0),
                Phase::Validate => ctx.set_validation_passed(true),
                Phase::Clean => ctx.set_cleanup_done(true),
                _ => {}
            }
            Ok(())
        }
    }

    fn pipeline(calls: &Arc<AtomicUsize>) -> Vec<Arc<dyn Subprocess>> {
        Phase::PIPELINE
            .iter()
            .map(|p| StubSubprocess::ok(*p, calls.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_all_phases_run_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let executor = SubprocessExecutor::new(Arc::new(test_config(1, 1)));
        let mut ctx = EtlContext::new(TradeDate::parse("20250101").unwrap());

        let outcome = executor.execute_all(&mut ctx, &pipeline(&calls)).await;

        assert!(outcome.failure.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(ctx.current_phase(), Phase::Complete);
        let phases: Vec<Phase> = outcome.per_phase.iter().map(|r| r.phase).collect();
        assert_eq!(phases, Phase::PIPELINE.to_vec());
        assert!(outcome.per_phase.iter().all(|r| r.success));
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_phases() {
        let calls = Arc::new(AtomicUsize::new(0));
        let subprocesses = vec![
            StubSubprocess::ok(Phase::Extract, calls.clone()),
            StubSubprocess::failing(Phase::Transform, calls.clone()),
            StubSubprocess::ok(Phase::Load, calls.clone()),
        ];
        let executor = SubprocessExecutor::new(Arc::new(test_config(1, 1)));
        let mut ctx = EtlContext::new(TradeDate::parse("20250101").unwrap());

        let outcome = executor.execute_all(&mut ctx, &subprocesses).await;

        // Load was never invoked
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.current_phase(), Phase::Failed);
        match outcome.failure.unwrap() {
            EtlError::PhaseFailure { phase, .. } => assert_eq!(phase, Phase::Transform),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(outcome.per_phase.len(), 2);
        assert!(!outcome.per_phase[1].success);
    }

    #[tokio::test]
    async fn test_extract_precondition_requires_sources() {
        let calls = Arc::new(AtomicUsize::new(0));
        let executor = SubprocessExecutor::new(Arc::new(test_config(0, 1)));
        let mut ctx = EtlContext::new(TradeDate::parse("20250101").unwrap());

        let outcome = executor.execute_all(&mut ctx, &pipeline(&calls)).await;

        // The subprocess itself never ran
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let failure = outcome.failure.unwrap();
        assert!(failure.to_string().contains("no sources configured"));
        match failure.root_cause() {
            EtlError::PreconditionViolation { phase, .. } => assert_eq!(*phase, Phase::Extract),
            other => panic!("unexpected root cause: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validate_precondition_requires_loaded_count() {
        let calls = Arc::new(AtomicUsize::new(0));
        let subprocesses = vec![StubSubprocess::ok(Phase::Validate, calls.clone())];
        let executor = SubprocessExecutor::new(Arc::new(test_config(1, 1)));
        let mut ctx = EtlContext::new(TradeDate::parse("20250101").unwrap());

        let outcome = executor.execute_all(&mut ctx, &subprocesses).await;
        assert!(outcome.failure.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
