// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Workflow Result Types
//!
//! Value objects aggregating what happened: one `SubprocessResult` per phase
//! run, one `DailyResult` per calendar date attempted, one `WorkflowResult`
//! per engine invocation. Day results are keyed by date in an ordered map, so
//! iteration is ascending by date; the day counts are derived from the map,
//! which makes `total = successful + failed` structural.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::entities::etl_context::ContextSnapshot;
use crate::entities::phase::Phase;
use crate::value_objects::TradeDate;

/// Outcome of one phase run within a day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubprocessResult {
    pub phase: Phase,
    pub success: bool,
    /// Phase-relevant record count (extracted, transformed, or loaded)
    pub record_count: u64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Outcome of one calendar date.
#[derive(Debug, Clone, Serialize)]
pub struct DailyResult {
    pub date: TradeDate,
    pub success: bool,
    pub per_phase: Vec<SubprocessResult>,
    /// The phase that failed, when `success` is false
    pub failed_phase: Option<Phase>,
    /// Root-cause summary, when `success` is false
    pub failure: Option<String>,
    /// Context state at day end, for diagnostics
    pub snapshot: ContextSnapshot,
}

impl DailyResult {
    /// Builds a successful day result.
    pub fn succeeded(date: TradeDate, per_phase: Vec<SubprocessResult>, snapshot: ContextSnapshot) -> Self {
        Self {
            date,
            success: true,
            per_phase,
            failed_phase: None,
            failure: None,
            snapshot,
        }
    }

    /// Builds a failed day result naming the phase and root cause.
    pub fn failed(
        date: TradeDate,
        per_phase: Vec<SubprocessResult>,
        failed_phase: Phase,
        failure: impl Into<String>,
        snapshot: ContextSnapshot,
    ) -> Self {
        Self {
            date,
            success: false,
            per_phase,
            failed_phase: Some(failed_phase),
            failure: Some(failure.into()),
            snapshot,
        }
    }
}

/// Outcome of a multi-day run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub start_date: TradeDate,
    pub end_date: TradeDate,
    /// Attempted days, ascending by date. Days after a failure are absent.
    pub per_day: BTreeMap<TradeDate, DailyResult>,
}

impl WorkflowResult {
    pub fn new(start_date: TradeDate, end_date: TradeDate) -> Self {
        Self {
            start_date,
            end_date,
            per_day: BTreeMap::new(),
        }
    }

    /// Records one day's outcome.
    pub fn record_day(&mut self, result: DailyResult) {
        self.per_day.insert(result.date, result);
    }

    /// Days attempted.
    pub fn total_days(&self) -> u64 {
        self.per_day.len() as u64
    }

    /// Days that completed Clean.
    pub fn successful_days(&self) -> u64 {
        self.per_day.values().filter(|d| d.success).count() as u64
    }

    /// Days that failed; at most one under halt-on-first-failure.
    pub fn failed_days(&self) -> u64 {
        self.per_day.values().filter(|d| !d.success).count() as u64
    }

    /// Whether the run halted before `end_date`.
    pub fn halted(&self) -> bool {
        self.failed_days() > 0
    }
}
