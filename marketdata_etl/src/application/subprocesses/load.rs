// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Load Subprocess
//!
//! Drives the staged load sequence for one date:
//!
//! 1. ping the target database through the loader,
//! 2. create the staging tables for the target types present today (kept out
//!    of the loader so it stays target-agnostic),
//! 3. sort — null-sort-key records are dropped and counted,
//! 4. bulk-load partition by partition,
//! 5. record the loaded count and the staging plan in the context for the
//!    Validate and Clean phases.
//!
//! On failure anything already staged stays in place; the staging plan
//! attribute still names the tables so operators can find the remains.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use crate::infrastructure::config::LoaderConfig;
use crate::infrastructure::loading::staging::{create_script, plan_for_types};
use marketdata_etl_domain::{
    attribute_keys, DbSession, EtlContext, EtlError, Loader, Phase, RunId, Subprocess,
};

/// Stages and bulk-loads one date's transformed records.
pub struct LoadSubprocess {
    loader: Arc<dyn Loader>,
    session: Arc<dyn DbSession>,
    config: LoaderConfig,
    run_id: RunId,
}

impl LoadSubprocess {
    pub fn new(
        loader: Arc<dyn Loader>,
        session: Arc<dyn DbSession>,
        config: LoaderConfig,
        run_id: RunId,
    ) -> Self {
        Self {
            loader,
            session,
            config,
            run_id,
        }
    }
}

#[async_trait]
impl Subprocess for LoadSubprocess {
    fn phase(&self) -> Phase {
        Phase::Load
    }

    async fn execute(&self, ctx: &mut EtlContext) -> Result<(), EtlError> {
        let records = ctx.transformed_data().map(<[_]>::to_vec).unwrap_or_default();

        self.loader.init().await?;

        // Stage creation for the types present today
        let present: BTreeSet<&str> = records.iter().map(|r| r.type_name()).collect();
        let plan = plan_for_types(&self.config, &self.run_id, &present);
        if !plan.is_empty() {
            self.session.run_script(&create_script(&plan)).await?;
            info!(date = %ctx.current_date(), tables = plan.len(), "staging tables created");
        }
        ctx.set_attribute(attribute_keys::STAGING_PLAN, serde_json::to_value(&plan)?);

        let outcome = self.loader.sort_data(records).await?;
        ctx.set_attribute(
            attribute_keys::DROPPED_NULL_SORT_KEY,
            serde_json::json!(outcome.dropped_null_key),
        );

        let report = self.loader.load_data(outcome.records).await?;
        ctx.set_loaded_count(report.total_rows());
        // Re-record the plan with landed row counts for Validate
        ctx.set_attribute(attribute_keys::STAGING_PLAN, serde_json::to_value(&report.partitions)?);
        Ok(())
    }
}
