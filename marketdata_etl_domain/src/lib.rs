// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Market Data ETL Domain
//!
//! Core business logic of the daily-batch market-data ETL engine, independent
//! of runtimes, databases, and user interfaces.
//!
//! ## Module Structure
//!
//! - **entities**: the per-day [`EtlContext`], the [`Phase`] state machine,
//!   and the result aggregates
//! - **value_objects**: validated dates and ranges, run identity, the sort
//!   memory budget
//! - **records**: source and target record shapes, field-value coercion, and
//!   column metadata for bulk inserts
//! - **services**: the transformation engine and the infrastructure ports
//!   (extractor, loader, database session, subprocess)
//! - **error**: the [`EtlError`] hierarchy; no local recovery anywhere
//!
//! ## Business Rules
//!
//! - A day's phase sequence is Extract → Transform → Load → Validate → Clean,
//!   strictly ordered; any phase may fail, ending the day and the run.
//! - Transformation is one source record to one target record; unmapped
//!   target fields stay at their sentinels (`-1` / `NaN`).
//! - Loading partitions by target type and inserts sequentially so a failure
//!   leaves earlier partitions staged for forensics.

pub mod entities;
pub mod error;
pub mod records;
pub mod services;
pub mod value_objects;

pub use entities::{
    attribute_keys, ContextSnapshot, DailyResult, EtlContext, Phase, SubprocessResult,
    WorkflowResult,
};
pub use error::EtlError;
pub use records::{Column, ColumnKind, ColumnSpec, ColumnValues, SourceRecord, TargetRecord};
pub use services::{
    CancelFlag, DbSession, Extractor, Loader, LoadReport, PartitionLoad, SortOutcome, Subprocess,
    TransformBatch, Transformer, TransformerRegistry, UnmappedFieldPolicy,
};
pub use value_objects::{DateRange, RunId, SortMemoryLimit, TradeDate};
