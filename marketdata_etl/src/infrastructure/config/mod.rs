// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Run configuration loading and validation.

pub mod etl_config;

pub use etl_config::{
    Credentials, EtlConfig, LoaderConfig, LoggingConfig, SourceConfig, TableMapping, TargetConfig,
    TransformConfig, ValidationConfig, DEFAULT_RECORD_BYTES_ESTIMATE,
};
