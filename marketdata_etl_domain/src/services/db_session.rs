// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Database Session Port
//!
//! Opaque handle to the analytical database. The engine treats the wire
//! protocol as a collaborator concern: staging scripts are opaque text blobs,
//! bulk loading is a `tableInsert`-style call taking per-column scalar arrays
//! of equal length, and validation reads row counts back. One session is
//! owned by the loader and shared across the Load, Validate, and Clean phases
//! of a run.

use async_trait::async_trait;

use crate::error::EtlError;
use crate::records::Column;

/// Opaque database session accepting scripts and column arrays.
#[async_trait]
pub trait DbSession: Send + Sync + std::fmt::Debug {
    /// Executes an opaque script (staging-table create/drop).
    async fn run_script(&self, script: &str) -> Result<(), EtlError>;

    /// Bulk-inserts one partition. Column arrays must share one length and
    /// match the table schema; returns the number of rows inserted.
    async fn table_insert(&self, table: &str, columns: &[Column]) -> Result<u64, EtlError>;

    /// Current row count of a table.
    async fn table_row_count(&self, table: &str) -> Result<u64, EtlError>;

    /// Closes the session. Called on every exit path.
    async fn close(&self) -> Result<(), EtlError>;
}
