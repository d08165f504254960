// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transform Subprocess
//!
//! Thin phase wrapper over the transform orchestrator, which owns the
//! parallel fan-out and fail-fast semantics.

use async_trait::async_trait;

use crate::application::orchestration::transform_orchestrator::TransformOrchestrator;
use marketdata_etl_domain::{EtlContext, EtlError, Phase, Subprocess};

/// Runs the transformation fan-out for one date.
pub struct TransformSubprocess {
    orchestrator: TransformOrchestrator,
}

impl TransformSubprocess {
    pub fn new(orchestrator: TransformOrchestrator) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl Subprocess for TransformSubprocess {
    fn phase(&self) -> Phase {
        Phase::Transform
    }

    async fn execute(&self, ctx: &mut EtlContext) -> Result<(), EtlError> {
        self.orchestrator.execute(ctx).await
    }
}
