// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Clean Subprocess
//!
//! Drops the day's staging tables. The chain only reaches this phase after
//! validation succeeded; a non-passing verdict (defensive, should not occur)
//! retains the tables for forensics and reports cleanup as not done.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::infrastructure::loading::staging::drop_script;
use marketdata_etl_domain::{attribute_keys, DbSession, EtlContext, EtlError, Phase, Subprocess};

/// Staging teardown after successful validation.
pub struct CleanSubprocess {
    session: Arc<dyn DbSession>,
}

impl CleanSubprocess {
    pub fn new(session: Arc<dyn DbSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Subprocess for CleanSubprocess {
    fn phase(&self) -> Phase {
        Phase::Clean
    }

    async fn execute(&self, ctx: &mut EtlContext) -> Result<(), EtlError> {
        if ctx.validation_passed() != Some(true) {
            warn!(date = %ctx.current_date(), "validation did not pass; staging tables retained");
            ctx.set_cleanup_done(false);
            return Ok(());
        }

        let staging_tables: Vec<String> = ctx
            .attribute(attribute_keys::STAGING_PLAN)
            .and_then(|value| value.as_array().cloned())
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| entry.get("staging_table"))
            .filter_map(|name| name.as_str().map(str::to_string))
            .collect();

        if !staging_tables.is_empty() {
            self.session.run_script(&drop_script(&staging_tables)).await?;
            info!(date = %ctx.current_date(), tables = staging_tables.len(), "staging tables dropped");
        }
        ctx.set_cleanup_done(true);
        Ok(())
    }
}
