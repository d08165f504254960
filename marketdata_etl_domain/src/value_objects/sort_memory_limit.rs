// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Sort Memory Limit Value Object
//!
//! The memory budget the sorter may hold in RAM before switching to the
//! disk-backed external path. Configured in whole mebibytes
//! (`max.memory.mb`, default 256); zero is rejected because a zero budget
//! would force one-record spill chunks.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EtlError;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Validated in-memory sort budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortMemoryLimit(u64);

impl SortMemoryLimit {
    /// Default budget: 256 MiB.
    pub const DEFAULT_MB: u64 = 256;

    /// Builds a limit from whole mebibytes.
    pub fn from_mb(mb: u64) -> Result<Self, EtlError> {
        if mb == 0 {
            return Err(EtlError::invalid_config("max.memory.mb must be at least 1"));
        }
        Ok(Self(mb * BYTES_PER_MB))
    }

    /// The budget in bytes.
    pub fn bytes(&self) -> u64 {
        self.0
    }
}

impl Default for SortMemoryLimit {
    fn default() -> Self {
        Self(Self::DEFAULT_MB * BYTES_PER_MB)
    }
}

impl fmt::Display for SortMemoryLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MB", self.0 / BYTES_PER_MB)
    }
}
