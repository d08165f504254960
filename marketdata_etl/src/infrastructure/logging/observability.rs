// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Observability Setup
//!
//! Initializes the tracing subscriber from the `[logging]` configuration
//! block: level filter plus an optional append-mode log file. With no file
//! configured, events go to stderr. Called once at startup, before the first
//! day runs.

use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::LoggingConfig;
use marketdata_etl_domain::EtlError;

/// Installs the global subscriber. Fails on an unparseable level filter or an
/// unwritable log file; both are configuration errors.
pub fn init_logging(config: &LoggingConfig) -> Result<(), EtlError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| EtlError::invalid_config(format!("invalid logLevel '{}': {}", config.log_level, e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match &config.log_file_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        EtlError::invalid_config(format!(
                            "cannot create log directory {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    EtlError::invalid_config(format!("cannot open log file {}: {}", path.display(), e))
                })?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None => builder.try_init(),
    };

    // A second init in one process (tests) is not an error worth failing a run
    let _ = result;
    Ok(())
}
