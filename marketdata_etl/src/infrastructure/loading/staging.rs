// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Staging Table Scripts
//!
//! Naming and script generation for per-run temporary staging tables. Each
//! target table gets one staging table named `<prefix><targetTable>_<runId>`
//! mirroring its schema; the create and drop scripts are opaque text executed
//! through the session port. Staging tables are dropped only after validation
//! succeeds; on any failure they stay behind for forensic analysis.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::infrastructure::config::LoaderConfig;
use marketdata_etl_domain::RunId;

/// One staging table of the run's plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingTable {
    pub data_type: String,
    pub target_table: String,
    pub staging_table: String,
}

/// `<prefix><targetTable>_<runId>`.
pub fn staging_table_name(prefix: &str, target_table: &str, run_id: &RunId) -> String {
    format!("{}{}_{}", prefix, target_table, run_id.as_table_suffix())
}

/// Builds the staging plan for the target types present in this day's data,
/// in configured mapping order.
pub fn plan_for_types(config: &LoaderConfig, run_id: &RunId, present_types: &BTreeSet<&str>) -> Vec<StagingTable> {
    config
        .table_mappings
        .iter()
        .filter(|mapping| present_types.contains(mapping.data_type.as_str()))
        .map(|mapping| StagingTable {
            data_type: mapping.data_type.clone(),
            target_table: mapping.table_name.clone(),
            staging_table: staging_table_name(&config.temporary_table_prefix, &mapping.table_name, run_id),
        })
        .collect()
}

/// Create-script: one empty schema-mirroring shared table per plan entry.
pub fn create_script(plan: &[StagingTable]) -> String {
    plan.iter()
        .map(|table| {
            format!(
                "share(select top 0 * from {}, `{})",
                table.target_table, table.staging_table
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop-script for the plan's staging tables.
pub fn drop_script(staging_tables: &[String]) -> String {
    staging_tables
        .iter()
        .map(|name| format!("undef(`{}, SHARED)", name))
        .collect::<Vec<_>>()
        .join("\n")
}
