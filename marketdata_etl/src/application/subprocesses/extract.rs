// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Extract Subprocess
//!
//! Reads every configured source for the day's date and concatenates the
//! results into the context, in configured source order. An empty day is a
//! success; a failing source fails the phase.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use marketdata_etl_domain::{EtlContext, EtlError, Extractor, Phase, Subprocess};

/// Runs the configured extractors for one date.
pub struct ExtractSubprocess {
    extractors: Vec<Arc<dyn Extractor>>,
}

impl ExtractSubprocess {
    pub fn new(extractors: Vec<Arc<dyn Extractor>>) -> Self {
        Self { extractors }
    }
}

#[async_trait]
impl Subprocess for ExtractSubprocess {
    fn phase(&self) -> Phase {
        Phase::Extract
    }

    async fn execute(&self, ctx: &mut EtlContext) -> Result<(), EtlError> {
        let date = ctx.current_date();
        let mut all = Vec::new();
        for extractor in &self.extractors {
            let records = extractor.extract(date).await?;
            info!(
                source = extractor.source_name(),
                date = %date,
                records = records.len(),
                "source extracted"
            );
            all.extend(records);
        }
        ctx.set_extracted_count(all.len() as u64);
        ctx.set_extracted_data(all);
        Ok(())
    }
}
