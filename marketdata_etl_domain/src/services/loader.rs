// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Loader Port
//!
//! The common loading API the Load phase drives: connect, sort, bulk-load,
//! shut down. Staging-table creation and teardown stay with the load and
//! clean subprocesses so a loader implementation remains target-agnostic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EtlError;
use crate::records::TargetRecord;

/// Sorted records plus the null-key drop count.
#[derive(Debug, Clone)]
pub struct SortOutcome {
    pub records: Vec<TargetRecord>,
    /// Records dropped because a configured sort key was null
    pub dropped_null_key: u64,
}

/// One partition's landing, for validation and forensics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionLoad {
    pub data_type: String,
    pub target_table: String,
    pub staging_table: String,
    pub rows: u64,
}

/// Outcome of `load_data` across all partitions.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub partitions: Vec<PartitionLoad>,
}

impl LoadReport {
    /// Total rows inserted across partitions.
    pub fn total_rows(&self) -> u64 {
        self.partitions.iter().map(|p| p.rows).sum()
    }
}

/// Target-database loader driven by the Load phase.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Verifies connectivity and configuration before any data moves.
    async fn init(&self) -> Result<(), EtlError>;

    /// Stable sort by the configured keys; records with a null in any key are
    /// dropped and counted.
    async fn sort_data(&self, records: Vec<TargetRecord>) -> Result<SortOutcome, EtlError>;

    /// Partitions by target type and bulk-inserts each partition into its
    /// staging table, sequentially, in configured mapping order.
    async fn load_data(&self, sorted: Vec<TargetRecord>) -> Result<LoadReport, EtlError>;

    /// Releases the session. Called on every exit path.
    async fn shutdown(&self) -> Result<(), EtlError>;
}
