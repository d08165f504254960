// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Validate Subprocess
//!
//! Checks the day's load against the configured rule families:
//!
//! - **completeness**: each staging table's row count equals the partition
//!   size the loader reported
//! - **quality**: the loaded count never exceeds the transformed count
//! - **consistency**: transformation stayed 1:1 with extraction
//!
//! Every violation is recorded on the context; any violation fails the phase
//! (and therefore the day), leaving the staging tables in place.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::infrastructure::config::ValidationConfig;
use marketdata_etl_domain::services::loader::PartitionLoad;
use marketdata_etl_domain::{attribute_keys, DbSession, EtlContext, EtlError, Phase, Subprocess};

/// Row-count and invariant validation after the load.
pub struct ValidateSubprocess {
    session: Arc<dyn DbSession>,
    config: ValidationConfig,
}

impl ValidateSubprocess {
    pub fn new(session: Arc<dyn DbSession>, config: ValidationConfig) -> Self {
        Self { session, config }
    }

    fn staged_partitions(&self, ctx: &EtlContext) -> Result<Vec<PartitionLoad>, EtlError> {
        match ctx.attribute(attribute_keys::STAGING_PLAN) {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl Subprocess for ValidateSubprocess {
    fn phase(&self) -> Phase {
        Phase::Validate
    }

    async fn execute(&self, ctx: &mut EtlContext) -> Result<(), EtlError> {
        let mut errors: Vec<String> = Vec::new();

        if self.config.completeness {
            for partition in self.staged_partitions(ctx)? {
                let actual = self.session.table_row_count(&partition.staging_table).await?;
                if actual != partition.rows {
                    errors.push(format!(
                        "staging table {} holds {} rows, expected {}",
                        partition.staging_table, actual, partition.rows
                    ));
                }
            }
        }

        if self.config.quality {
            if let (Some(loaded), Some(transformed)) = (ctx.loaded_count(), ctx.transformed_count()) {
                if loaded > transformed {
                    errors.push(format!(
                        "loaded count {} exceeds transformed count {}",
                        loaded, transformed
                    ));
                }
            }
        }

        if self.config.consistency {
            if let (Some(extracted), Some(transformed)) = (ctx.extracted_count(), ctx.transformed_count()) {
                if transformed != extracted {
                    errors.push(format!(
                        "transformed count {} differs from extracted count {}",
                        transformed, extracted
                    ));
                }
            }
        }

        for error in &errors {
            ctx.add_validation_error(error.clone());
        }
        let passed = errors.is_empty();
        ctx.set_validation_passed(passed);

        if passed {
            info!(date = %ctx.current_date(), loaded = ctx.loaded_count().unwrap_or(0), "validation passed");
            Ok(())
        } else {
            Err(EtlError::validation_failed(errors.join("; ")))
        }
    }
}
