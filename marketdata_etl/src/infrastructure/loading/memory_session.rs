// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Memory Session
//!
//! `DbSession` backend holding tables in process memory. Used for local smoke
//! runs (`connection.url = mem://...`) and as the substrate of the test
//! suite; production deployments inject a vendor-backed session through the
//! same port. It understands exactly the script shapes the staging module
//! emits — `share(select top 0 * from <t>, `<s>)` and `undef(`<s>, SHARED)` —
//! plus a bare arithmetic ping.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::debug;

use marketdata_etl_domain::{Column, DbSession, EtlError};

#[derive(Debug, Default)]
struct StoredTable {
    rows: u64,
}

/// Process-local table store behind the session port.
#[derive(Debug, Default)]
pub struct MemorySession {
    tables: Mutex<HashMap<String, StoredTable>>,
    closed: AtomicBool,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the tables currently present, sorted. For diagnostics and
    /// test assertions.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.lock().expect("session store poisoned").keys().cloned().collect();
        names.sort();
        names
    }

    /// Synchronous row-count peek.
    pub fn rows_in(&self, table: &str) -> Option<u64> {
        self.tables.lock().expect("session store poisoned").get(table).map(|t| t.rows)
    }

    fn ensure_open(&self) -> Result<(), EtlError> {
        if self.closed.load(Ordering::Relaxed) {
            Err(EtlError::database_error("session is closed"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DbSession for MemorySession {
    async fn run_script(&self, script: &str) -> Result<(), EtlError> {
        self.ensure_open()?;
        let mut tables = self.tables.lock().expect("session store poisoned");
        for line in script.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(name) = parse_share_line(line) {
                debug!(table = %name, "staging table created");
                tables.insert(name, StoredTable::default());
            } else if let Some(name) = parse_undef_line(line) {
                debug!(table = %name, "staging table dropped");
                tables.remove(&name).ok_or_else(|| {
                    EtlError::database_error(format!("cannot drop unknown table {}", name))
                })?;
            } else if line.chars().all(|c| c.is_ascii_digit() || " +-*/".contains(c)) {
                // Arithmetic ping
            } else {
                return Err(EtlError::database_error(format!("unsupported script line: {}", line)));
            }
        }
        Ok(())
    }

    async fn table_insert(&self, table: &str, columns: &[Column]) -> Result<u64, EtlError> {
        self.ensure_open()?;
        let Some(first) = columns.first() else {
            return Err(EtlError::database_error("bulk insert with no columns"));
        };
        let rows = first.values.len() as u64;
        if columns.iter().any(|c| c.values.len() as u64 != rows) {
            return Err(EtlError::database_error("column arrays differ in length"));
        }

        let mut tables = self.tables.lock().expect("session store poisoned");
        let stored = tables
            .get_mut(table)
            .ok_or_else(|| EtlError::database_error(format!("table {} does not exist", table)))?;
        stored.rows += rows;
        Ok(rows)
    }

    async fn table_row_count(&self, table: &str) -> Result<u64, EtlError> {
        self.ensure_open()?;
        self.rows_in(table)
            .ok_or_else(|| EtlError::database_error(format!("table {} does not exist", table)))
    }

    async fn close(&self) -> Result<(), EtlError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

fn parse_share_line(line: &str) -> Option<String> {
    let rest = line.strip_prefix("share(select top 0 * from ")?;
    let (_target, staging) = rest.split_once(", `")?;
    Some(staging.strip_suffix(')')?.to_string())
}

fn parse_undef_line(line: &str) -> Option<String> {
    let rest = line.strip_prefix("undef(`")?;
    Some(rest.strip_suffix(", SHARED)")?.to_string())
}
