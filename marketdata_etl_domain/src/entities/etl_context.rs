// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # ETL Context Entity
//!
//! The per-day state bag that travels with the phase chain. One context is
//! created per calendar date by the workflow engine, mutated only by the
//! currently executing phase, and released after Clean or on failure. Phases
//! never exchange data by direct call; everything moves through here.
//!
//! ## State Categories
//!
//! - **Identity**: the calendar date and the current phase
//! - **Data**: extracted source records and transformed target records,
//!   `None` before their producing phase has run
//! - **Counters**: extracted / transformed / loaded counts, `None` until set
//! - **Outcome**: validation verdict and errors, cleanup flag
//! - **Attributes**: a small generic map for forward-extension keys (run id,
//!   staging plan, sort diagnostics)
//!
//! ## Invariants
//!
//! - The phase advances only along the strict sequence enforced by
//!   [`Phase::can_transition_to`]; anything else is
//!   `EtlError::InvalidPhaseTransition`.
//! - Counters are unsigned; `loaded_count <= transformed_count` holds for
//!   every day that completes (the loader never invents rows).
//! - Record lists are never mutated once set.
//!
//! `snapshot()` produces a deep, immutable dump used in failure logs; record
//! lists are summarized by length so a snapshot of a million-row day stays
//! loggable.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::entities::phase::Phase;
use crate::error::EtlError;
use crate::records::{SourceRecord, TargetRecord};
use crate::value_objects::TradeDate;

/// Well-known keys of the generic attribute map.
pub mod attribute_keys {
    /// The run identifier stamped by the daily workflow.
    pub const RUN_ID: &str = "run_id";
    /// Staging plan written by the Load phase; read by Validate and Clean.
    pub const STAGING_PLAN: &str = "load.staging_plan";
    /// Count of records dropped for a null sort key.
    pub const DROPPED_NULL_SORT_KEY: &str = "sort.dropped_null_key";
}

/// Per-day state carried across the five phases.
#[derive(Debug, Clone)]
pub struct EtlContext {
    // Identity fields (always first)
    current_date: TradeDate,
    current_phase: Phase,

    // Data and counters, in pipeline order
    extracted_data: Option<Vec<SourceRecord>>,
    extracted_count: Option<u64>,
    transformed_data: Option<Vec<TargetRecord>>,
    transformed_count: Option<u64>,
    loaded_count: Option<u64>,
    validation_passed: Option<bool>,
    validation_errors: Vec<String>,
    cleanup_done: Option<bool>,

    // Extension map (always last)
    attributes: BTreeMap<String, serde_json::Value>,
}

/// Deep, immutable dump of a context for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSnapshot {
    pub current_date: TradeDate,
    pub current_phase: Phase,
    pub extracted_records: Option<usize>,
    pub extracted_count: Option<u64>,
    pub transformed_records: Option<usize>,
    pub transformed_count: Option<u64>,
    pub loaded_count: Option<u64>,
    pub validation_passed: Option<bool>,
    pub validation_errors: Vec<String>,
    pub cleanup_done: Option<bool>,
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl EtlContext {
    /// Creates a fresh context for one calendar date.
    pub fn new(date: TradeDate) -> Self {
        Self {
            current_date: date,
            current_phase: Phase::NotStarted,
            extracted_data: None,
            extracted_count: None,
            transformed_data: None,
            transformed_count: None,
            loaded_count: None,
            validation_passed: None,
            validation_errors: Vec::new(),
            cleanup_done: None,
            attributes: BTreeMap::new(),
        }
    }

    /// The calendar date this context belongs to.
    pub fn current_date(&self) -> TradeDate {
        self.current_date
    }

    /// The phase currently holding the context.
    pub fn current_phase(&self) -> Phase {
        self.current_phase
    }

    /// Advances the phase, rejecting transitions outside the strict sequence.
    pub fn set_current_phase(&mut self, next: Phase) -> Result<(), EtlError> {
        if !self.current_phase.can_transition_to(next) {
            return Err(EtlError::InvalidPhaseTransition {
                from: self.current_phase,
                to: next,
            });
        }
        self.current_phase = next;
        Ok(())
    }

    /// Marks the day failed. Legal from any non-terminal phase.
    pub fn fail(&mut self) -> Result<(), EtlError> {
        self.set_current_phase(Phase::Failed)
    }

    pub fn extracted_data(&self) -> Option<&[SourceRecord]> {
        self.extracted_data.as_deref()
    }

    pub fn set_extracted_data(&mut self, records: Vec<SourceRecord>) {
        self.extracted_data = Some(records);
    }

    pub fn extracted_count(&self) -> Option<u64> {
        self.extracted_count
    }

    pub fn set_extracted_count(&mut self, count: u64) {
        self.extracted_count = Some(count);
    }

    pub fn transformed_data(&self) -> Option<&[TargetRecord]> {
        self.transformed_data.as_deref()
    }

    pub fn set_transformed_data(&mut self, records: Vec<TargetRecord>) {
        self.transformed_data = Some(records);
    }

    pub fn transformed_count(&self) -> Option<u64> {
        self.transformed_count
    }

    pub fn set_transformed_count(&mut self, count: u64) {
        self.transformed_count = Some(count);
    }

    pub fn loaded_count(&self) -> Option<u64> {
        self.loaded_count
    }

    pub fn set_loaded_count(&mut self, count: u64) {
        self.loaded_count = Some(count);
    }

    pub fn validation_passed(&self) -> Option<bool> {
        self.validation_passed
    }

    pub fn set_validation_passed(&mut self, passed: bool) {
        self.validation_passed = Some(passed);
    }

    pub fn validation_errors(&self) -> &[String] {
        &self.validation_errors
    }

    pub fn add_validation_error(&mut self, error: impl Into<String>) {
        self.validation_errors.push(error.into());
    }

    pub fn cleanup_done(&self) -> Option<bool> {
        self.cleanup_done
    }

    pub fn set_cleanup_done(&mut self, done: bool) {
        self.cleanup_done = Some(done);
    }

    /// Reads a generic attribute.
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    /// Writes a generic attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(key.into(), value);
    }

    /// Deep, immutable dump of all keys. Successive snapshots of an unchanged
    /// context are equal.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            current_date: self.current_date,
            current_phase: self.current_phase,
            extracted_records: self.extracted_data.as_ref().map(Vec::len),
            extracted_count: self.extracted_count,
            transformed_records: self.transformed_data.as_ref().map(Vec::len),
            transformed_count: self.transformed_count,
            loaded_count: self.loaded_count,
            validation_passed: self.validation_passed,
            validation_errors: self.validation_errors.clone(),
            cleanup_done: self.cleanup_done,
            attributes: self.attributes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::XbondQuoteSource;

    fn context() -> EtlContext {
        EtlContext::new(TradeDate::parse("20250101").unwrap())
    }

    #[test]
    fn test_new_context_is_empty() {
        let ctx = context();
        assert_eq!(ctx.current_phase(), Phase::NotStarted);
        assert!(ctx.extracted_data().is_none());
        assert!(ctx.extracted_count().is_none());
        assert!(ctx.transformed_data().is_none());
        assert!(ctx.loaded_count().is_none());
        assert!(ctx.validation_passed().is_none());
        assert!(ctx.cleanup_done().is_none());
    }

    #[test]
    fn test_phase_advances_in_sequence() {
        let mut ctx = context();
        for phase in Phase::PIPELINE {
            ctx.set_current_phase(phase).unwrap();
        }
        ctx.set_current_phase(Phase::Complete).unwrap();
        assert_eq!(ctx.current_phase(), Phase::Complete);
    }

    #[test]
    fn test_phase_skip_rejected() {
        let mut ctx = context();
        let err = ctx.set_current_phase(Phase::Load).unwrap_err();
        match err {
            EtlError::InvalidPhaseTransition { from, to } => {
                assert_eq!(from, Phase::NotStarted);
                assert_eq!(to, Phase::Load);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // The failed transition left the phase untouched
        assert_eq!(ctx.current_phase(), Phase::NotStarted);
    }

    #[test]
    fn test_fail_from_any_active_phase() {
        let mut ctx = context();
        ctx.set_current_phase(Phase::Extract).unwrap();
        ctx.set_current_phase(Phase::Transform).unwrap();
        ctx.fail().unwrap();
        assert_eq!(ctx.current_phase(), Phase::Failed);
        assert!(ctx.set_current_phase(Phase::Load).is_err());
    }

    #[test]
    fn test_data_setters() {
        let mut ctx = context();
        ctx.set_extracted_data(vec![SourceRecord::XbondQuote(XbondQuoteSource::default())]);
        ctx.set_extracted_count(1);
        assert_eq!(ctx.extracted_data().unwrap().len(), 1);
        assert_eq!(ctx.extracted_count(), Some(1));
    }

    #[test]
    fn test_attributes() {
        let mut ctx = context();
        ctx.set_attribute(attribute_keys::RUN_ID, serde_json::json!("01J0000"));
        assert_eq!(
            ctx.attribute(attribute_keys::RUN_ID),
            Some(&serde_json::json!("01J0000"))
        );
        assert!(ctx.attribute("missing").is_none());
    }

    #[test]
    fn test_snapshot_idempotent() {
        let mut ctx = context();
        ctx.set_extracted_data(vec![SourceRecord::XbondQuote(XbondQuoteSource::default())]);
        ctx.set_extracted_count(1);
        ctx.add_validation_error("row count mismatch");
        let first = ctx.snapshot();
        let second = ctx.snapshot();
        assert_eq!(first, second);
    }

    #[test]
    fn test_snapshot_summarizes_record_lists() {
        let mut ctx = context();
        ctx.set_extracted_data(vec![
            SourceRecord::XbondQuote(XbondQuoteSource::default()),
            SourceRecord::XbondQuote(XbondQuoteSource::default()),
        ]);
        let snapshot = ctx.snapshot();
        assert_eq!(snapshot.extracted_records, Some(2));
        assert_eq!(snapshot.transformed_records, None);
    }
}
