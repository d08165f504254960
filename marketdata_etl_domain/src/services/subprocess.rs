// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Subprocess Port
//!
//! One phase of a day's pipeline. Implementations read their inputs from the
//! context and write their outputs back to it; the executor owns sequencing,
//! precondition checks, and result recording around each call.

use async_trait::async_trait;

use crate::entities::{EtlContext, Phase};
use crate::error::EtlError;

/// One executable phase.
#[async_trait]
pub trait Subprocess: Send + Sync {
    /// The phase this subprocess implements.
    fn phase(&self) -> Phase;

    /// Runs the phase against the context. The context is exclusively owned
    /// by this call for its duration.
    async fn execute(&self, ctx: &mut EtlContext) -> Result<(), EtlError>;
}
