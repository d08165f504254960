// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Daily Workflow
//!
//! One calendar date's pipeline: build a fresh context, stamp the run id,
//! drive the canonical five phases through the executor, and fold the outcome
//! into a `DailyResult`. The subprocess list is checked against the canonical
//! phase sequence at construction so a miswired assembly fails before any day
//! runs.

use std::sync::Arc;
use tracing::{error, info};

use crate::application::orchestration::subprocess_executor::SubprocessExecutor;
use marketdata_etl_domain::{
    attribute_keys, DailyResult, EtlContext, EtlError, Phase, RunId, Subprocess, TradeDate,
};

/// Five-phase pipeline for one date.
pub struct DailyWorkflow {
    executor: SubprocessExecutor,
    subprocesses: Vec<Arc<dyn Subprocess>>,
    run_id: RunId,
}

impl DailyWorkflow {
    /// Wires the workflow; the subprocess list must be exactly the canonical
    /// pipeline, in order.
    pub fn new(
        executor: SubprocessExecutor,
        subprocesses: Vec<Arc<dyn Subprocess>>,
        run_id: RunId,
    ) -> Result<Self, EtlError> {
        let phases: Vec<Phase> = subprocesses.iter().map(|s| s.phase()).collect();
        if phases != Phase::PIPELINE {
            return Err(EtlError::invalid_config(format!(
                "daily workflow requires the canonical phase list, got {:?}",
                phases
            )));
        }
        Ok(Self {
            executor,
            subprocesses,
            run_id,
        })
    }

    /// Runs one date and reports its outcome; failures are folded into the
    /// result, not propagated.
    pub async fn execute(&self, date: TradeDate) -> DailyResult {
        info!(date = %date, run_id = %self.run_id, "day started");
        let mut ctx = EtlContext::new(date);
        ctx.set_attribute(attribute_keys::RUN_ID, serde_json::json!(self.run_id.to_string()));

        let outcome = self.executor.execute_all(&mut ctx, &self.subprocesses).await;
        match outcome.failure {
            None => {
                info!(
                    date = %date,
                    extracted = ctx.extracted_count().unwrap_or(0),
                    transformed = ctx.transformed_count().unwrap_or(0),
                    loaded = ctx.loaded_count().unwrap_or(0),
                    "day complete"
                );
                DailyResult::succeeded(date, outcome.per_phase, ctx.snapshot())
            }
            Some(failure) => {
                let failed_phase = match &failure {
                    EtlError::PhaseFailure { phase, .. } => *phase,
                    _ => ctx.current_phase(),
                };
                error!(date = %date, phase = %failed_phase, error = %failure, "day failed");
                DailyResult::failed(date, outcome.per_phase, failed_phase, failure.to_string(), ctx.snapshot())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::orchestration::subprocess_executor::tests::test_config;
    use async_trait::async_trait;

    struct NoopSubprocess(Phase);

    #[async_trait]
    impl Subprocess for NoopSubprocess {
        fn phase(&self) -> Phase {
            self.0
        }

        async fn execute(&self, _ctx: &mut EtlContext) -> Result<(), EtlError> {
            Ok(())
        }
    }

    #[test]
    fn test_rejects_incomplete_phase_list() {
        let executor = SubprocessExecutor::new(Arc::new(test_config(1, 1)));
        let subprocesses: Vec<Arc<dyn Subprocess>> = vec![
            Arc::new(NoopSubprocess(Phase::Extract)),
            Arc::new(NoopSubprocess(Phase::Load)),
        ];
        assert!(DailyWorkflow::new(executor, subprocesses, RunId::new()).is_err());
    }

    #[test]
    fn test_rejects_misordered_phase_list() {
        let executor = SubprocessExecutor::new(Arc::new(test_config(1, 1)));
        let subprocesses: Vec<Arc<dyn Subprocess>> = vec![
            Arc::new(NoopSubprocess(Phase::Transform)),
            Arc::new(NoopSubprocess(Phase::Extract)),
            Arc::new(NoopSubprocess(Phase::Load)),
            Arc::new(NoopSubprocess(Phase::Validate)),
            Arc::new(NoopSubprocess(Phase::Clean)),
        ];
        assert!(DailyWorkflow::new(executor, subprocesses, RunId::new()).is_err());
    }

    #[test]
    fn test_accepts_canonical_list() {
        let executor = SubprocessExecutor::new(Arc::new(test_config(1, 1)));
        let subprocesses: Vec<Arc<dyn Subprocess>> = Phase::PIPELINE
            .iter()
            .map(|p| Arc::new(NoopSubprocess(*p)) as Arc<dyn Subprocess>)
            .collect();
        assert!(DailyWorkflow::new(executor, subprocesses, RunId::new()).is_ok());
    }
}
