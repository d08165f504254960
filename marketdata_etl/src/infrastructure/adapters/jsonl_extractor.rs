// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # JSONL File Extractor
//!
//! File-backed `Extractor` for sources of type `jsonl`: one type-tagged JSON
//! source record per line. The configured connection string is the file path;
//! a `{date}` placeholder is replaced with the compact trade date, so one
//! source block can serve a multi-day run. Feed-specific readers (database,
//! API) are injected by deployments through the same port.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use marketdata_etl_domain::{EtlError, Extractor, SourceRecord, TradeDate};

/// Reads source records from a JSON-lines file.
pub struct JsonlFileExtractor {
    name: String,
    path_template: String,
}

impl JsonlFileExtractor {
    /// `path_template` may contain `{date}`, replaced per extraction with the
    /// compact `YYYYMMDD` date.
    pub fn new(name: impl Into<String>, path_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path_template: path_template.into(),
        }
    }

    fn path_for(&self, date: TradeDate) -> PathBuf {
        PathBuf::from(self.path_template.replace("{date}", &date.compact()))
    }
}

#[async_trait]
impl Extractor for JsonlFileExtractor {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, date: TradeDate) -> Result<Vec<SourceRecord>, EtlError> {
        let path = self.path_for(date);
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            EtlError::io_error(format!("source {}: cannot read {}: {}", self.name, path.display(), e))
        })?;

        let mut records = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: SourceRecord = serde_json::from_str(line).map_err(|e| {
                EtlError::SerializationError(format!(
                    "source {}: {} line {}: {}",
                    self.name,
                    path.display(),
                    line_no + 1,
                    e
                ))
            })?;
            records.push(record);
        }
        debug!(source = %self.name, path = %path.display(), records = records.len(), "jsonl file read");
        Ok(records)
    }
}
