// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Phase State Machine
//!
//! The `Phase` enum models the per-day pipeline state machine. A day starts in
//! `NotStarted`, advances through the five canonical phases in strict order,
//! and ends in one of two terminal states:
//!
//! ```text
//! NotStarted -> Extract -> Transform -> Load -> Validate -> Clean -> Complete
//!                  |            |         |         |          |
//!                  +------------+---------+---------+----------+--> Failed
//! ```
//!
//! No other transition is legal; the context's guarded setter rejects anything
//! outside this graph with `EtlError::InvalidPhaseTransition`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EtlError;

/// One step in a day's pipeline, plus the bracketing states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Initial state before any phase has run
    NotStarted,
    /// Read raw records from the configured sources
    Extract,
    /// Map source records to target records
    Transform,
    /// Sort, stage, and bulk-insert target records
    Load,
    /// Compare staged row counts against expected counts
    Validate,
    /// Drop staging tables after successful validation
    Clean,
    /// Terminal: all five phases succeeded
    Complete,
    /// Terminal: a phase failed; staging artifacts are retained
    Failed,
}

impl Phase {
    /// The five canonical phases of one day, in execution order.
    pub const PIPELINE: [Phase; 5] = [
        Phase::Extract,
        Phase::Transform,
        Phase::Load,
        Phase::Validate,
        Phase::Clean,
    ];

    /// Whether `next` is a legal transition from this phase.
    ///
    /// Forward-only along the pipeline; any non-terminal phase may fail.
    pub fn can_transition_to(self, next: Phase) -> bool {
        if next == Phase::Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Phase::NotStarted, Phase::Extract)
                | (Phase::Extract, Phase::Transform)
                | (Phase::Transform, Phase::Load)
                | (Phase::Load, Phase::Validate)
                | (Phase::Validate, Phase::Clean)
                | (Phase::Clean, Phase::Complete)
        )
    }

    /// Whether this phase ends the day.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::NotStarted => "not_started",
            Phase::Extract => "extract",
            Phase::Transform => "transform",
            Phase::Load => "load",
            Phase::Validate => "validate",
            Phase::Clean => "clean",
            Phase::Complete => "complete",
            Phase::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Phase {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "not_started" => Ok(Phase::NotStarted),
            "extract" => Ok(Phase::Extract),
            "transform" => Ok(Phase::Transform),
            "load" => Ok(Phase::Load),
            "validate" => Ok(Phase::Validate),
            "clean" => Ok(Phase::Clean),
            "complete" => Ok(Phase::Complete),
            "failed" => Ok(Phase::Failed),
            other => Err(EtlError::invalid_input(format!("unknown phase: {}", other))),
        }
    }
}
