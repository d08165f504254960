// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Run Identifier
//!
//! A ULID identifying one invocation of the engine. The run id is embedded in
//! staging-table names (`<prefix><targetTable>_<runId>`) so concurrent
//! forensic remains from distinct failed runs never collide. ULIDs are
//! lexicographically sortable, which keeps leftover staging tables listed in
//! creation order.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Unique identifier for a single engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Ulid);

impl RunId {
    /// Generates a fresh run id.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Crockford base32 rendering; alphanumeric, safe inside table names.
    pub fn as_table_suffix(&self) -> String {
        self.0.to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
