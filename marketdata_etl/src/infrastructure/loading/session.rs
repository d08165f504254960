// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Session Factory
//!
//! Opens the `DbSession` named by `[loader] connection.url`. The `mem://`
//! scheme maps to the in-process backend; any other scheme belongs to a
//! vendor client injected by the deployment through the session port, so the
//! shipped binary reports it as unreachable with masked credentials rather
//! than guessing at a wire protocol.

use std::sync::Arc;

use crate::infrastructure::config::LoaderConfig;
use crate::infrastructure::loading::memory_session::MemorySession;
use marketdata_etl_domain::{DbSession, EtlError};

/// Opens the configured session backend.
pub fn open_session(config: &LoaderConfig) -> Result<Arc<dyn DbSession>, EtlError> {
    if config.connection_url.starts_with("mem://") {
        Ok(Arc::new(MemorySession::new()))
    } else {
        Err(EtlError::invalid_config(format!(
            "no session backend built in for {}; deployments provide one through the DbSession port",
            config.masked_connection()
        )))
    }
}
