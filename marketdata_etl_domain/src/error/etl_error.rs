// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! Hierarchical error type for the daily-batch ETL domain. Every failure in
//! the engine is expressed as an `EtlError`; the propagation policy is strict:
//! no local recovery, every error ends the current day and the multi-day run.
//!
//! ## Error Categories
//!
//! - **Input**: malformed dates, inverted ranges — rejected before any day runs
//! - **Configuration**: parse errors, missing sections, unknown sort fields
//! - **Concurrency**: a second instance found the advisory lock held
//! - **Phase**: precondition violations and subprocess failures, wrapped with
//!   the phase name and calendar date
//! - **Transformation**: the first worker failure, wrapped with the source
//!   type and the number of records processed before it
//! - **Loading**: DB errors during partition insert, wrapped with the staging
//!   table name and the rows inserted before the failure
//!
//! Wrapped variants keep their root cause as a `#[source]` so diagnostics
//! print the full chain.

use thiserror::Error;

use crate::entities::phase::Phase;
use crate::value_objects::trade_date::TradeDate;

/// Domain-specific errors for the ETL engine.
///
/// Variants that wrap a cause (`PhaseFailure`, `Transformation`, `Loading`)
/// carry the forensic fields the failure contract requires; everything else
/// is a categorized message.
#[derive(Error, Debug, Clone)]
pub enum EtlError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Concurrent execution: {0}")]
    ConcurrentExecution(String),

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidPhaseTransition { from: Phase, to: Phase },

    #[error("Precondition violated for phase {phase}: {reason}")]
    PreconditionViolation { phase: Phase, reason: String },

    #[error("Phase {phase} failed on {date}: {cause}")]
    PhaseFailure {
        phase: Phase,
        date: TradeDate,
        #[source]
        cause: Box<EtlError>,
    },

    #[error("Transformation of {source_type} failed after {records_processed} records: {cause}")]
    Transformation {
        source_type: String,
        records_processed: u64,
        #[source]
        cause: Box<EtlError>,
    },

    #[error("Loading into {staging_table} failed after {records_inserted} records: {cause}")]
    Loading {
        staging_table: String,
        records_inserted: u64,
        #[source]
        cause: Box<EtlError>,
    },

    #[error("Malformed field: {0}")]
    MalformedField(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl EtlError {
    /// Creates a new input validation error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new concurrent-execution error
    pub fn concurrent_execution(msg: impl Into<String>) -> Self {
        Self::ConcurrentExecution(msg.into())
    }

    /// Wraps a cause with the phase and date that failed
    pub fn phase_failure(phase: Phase, date: TradeDate, cause: EtlError) -> Self {
        Self::PhaseFailure {
            phase,
            date,
            cause: Box::new(cause),
        }
    }

    /// Wraps a cause with the source type and records processed before failure
    pub fn transformation(source_type: impl Into<String>, records_processed: u64, cause: EtlError) -> Self {
        Self::Transformation {
            source_type: source_type.into(),
            records_processed,
            cause: Box::new(cause),
        }
    }

    /// Wraps a cause with the staging table and rows inserted before failure
    pub fn loading(staging_table: impl Into<String>, records_inserted: u64, cause: EtlError) -> Self {
        Self::Loading {
            staging_table: staging_table.into(),
            records_inserted,
            cause: Box::new(cause),
        }
    }

    /// Creates a new malformed-field error
    pub fn malformed_field(msg: impl Into<String>) -> Self {
        Self::MalformedField(msg.into())
    }

    /// Creates a new validation error
    pub fn validation_failed(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    /// Creates a new database error
    pub fn database_error(msg: impl Into<String>) -> Self {
        Self::DatabaseError(msg.into())
    }

    /// Creates a new IO error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::IoError(msg.into())
    }

    /// Creates a new cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Creates a new internal error
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Gets the error category
    pub fn category(&self) -> &'static str {
        match self {
            EtlError::InvalidInput(_) => "input",
            EtlError::InvalidConfiguration(_) => "configuration",
            EtlError::ConcurrentExecution(_) => "concurrency",
            EtlError::InvalidPhaseTransition { .. } => "phase",
            EtlError::PreconditionViolation { .. } => "phase",
            EtlError::PhaseFailure { .. } => "phase",
            EtlError::Transformation { .. } => "transformation",
            EtlError::Loading { .. } => "loading",
            EtlError::MalformedField(_) => "data",
            EtlError::ValidationFailed(_) => "validation",
            EtlError::DatabaseError(_) => "database",
            EtlError::IoError(_) => "io",
            EtlError::SerializationError(_) => "serialization",
            EtlError::Cancelled(_) => "cancellation",
            EtlError::InternalError(_) => "internal",
        }
    }

    /// Walks the cause chain to the innermost wrapped error
    pub fn root_cause(&self) -> &EtlError {
        match self {
            EtlError::PhaseFailure { cause, .. }
            | EtlError::Transformation { cause, .. }
            | EtlError::Loading { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

// Implement conversion from standard library errors
impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        EtlError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> Self {
        EtlError::SerializationError(err.to_string())
    }
}
