// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Workflow Engine
//!
//! The multi-day loop. Acquires the single-instance lock, iterates the
//! inclusive date range serially through the daily workflow, aggregates the
//! per-day results, and halts at the first failed day. The lock guard lives
//! on the stack for the whole run, so every exit path — including the
//! concurrent-execution rejection itself — releases it.

use std::path::PathBuf;
use tracing::{error, info};

use crate::application::orchestration::daily_workflow::DailyWorkflow;
use marketdata_etl_bootstrap::single_instance::{LockError, SingleInstanceLock};
use marketdata_etl_domain::{DateRange, EtlError, WorkflowResult};

/// Serial multi-day driver with halt-on-first-failure.
pub struct WorkflowEngine {
    workflow: DailyWorkflow,
    lock_path: PathBuf,
}

impl WorkflowEngine {
    pub fn new(workflow: DailyWorkflow, lock_path: PathBuf) -> Self {
        Self { workflow, lock_path }
    }

    /// Runs every date of the range in ascending order, stopping after the
    /// first failed day. A held lock elsewhere rejects the run before any day
    /// starts.
    pub async fn execute(&self, range: DateRange) -> Result<WorkflowResult, EtlError> {
        let _lock = SingleInstanceLock::try_acquire(&self.lock_path).map_err(|err| match err {
            LockError::AlreadyLocked(path) => EtlError::concurrent_execution(format!(
                "another instance holds the lock file {}",
                path.display()
            )),
            other => EtlError::io_error(other.to_string()),
        })?;

        info!(from = %range.from(), to = %range.to(), days = range.days(), "run started");
        let mut result = WorkflowResult::new(range.from(), range.to());
        for date in range.iter() {
            let daily = self.workflow.execute(date).await;
            let failed = !daily.success;
            result.record_day(daily);
            if failed {
                error!(date = %date, "halting run; remaining days are not attempted");
                break;
            }
        }

        info!(
            total_days = result.total_days(),
            successful_days = result.successful_days(),
            failed_days = result.failed_days(),
            "run finished"
        );
        Ok(result)
    }
}
