// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Extractor Port
//!
//! Infrastructure port for reading one source's records for one calendar
//! date. Concrete readers (file, database, API) live outside the domain and
//! are injected per configured source; extraction is I/O-bound, so the port
//! is async.

use async_trait::async_trait;

use crate::error::EtlError;
use crate::records::SourceRecord;
use crate::value_objects::TradeDate;

/// One configured source's reader.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// The configured source name this extractor serves.
    fn source_name(&self) -> &str;

    /// Reads all records for one date. An empty day returns an empty list,
    /// not an error.
    async fn extract(&self, date: TradeDate) -> Result<Vec<SourceRecord>, EtlError>;
}
