// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Process exit codes of the ETL binary. Scheduler integrations key on these,
//! so the mapping is part of the CLI contract:
//!
//! - **0**: success
//! - **1**: input validation (malformed date, inverted range, missing flags)
//! - **2**: concurrent execution (single-instance lock held elsewhere)
//! - **3**: ETL process error (a day failed; staging artifacts retained)
//! - **4**: configuration error (parse failure, missing section, bad loader
//!   settings)
//! - **5**: unexpected error

use std::fmt;

/// Exit codes of the ETL command-line interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful termination (0)
    #[default]
    Success = 0,

    /// Input validation error (1)
    /// - Malformed `--from` / `--to` date
    /// - `--from` after `--to`
    /// - Missing configuration file path
    InvalidInput = 1,

    /// Concurrent execution rejected (2)
    /// - Another instance holds the advisory lock
    ConcurrentExecution = 2,

    /// ETL process error (3)
    /// - A phase failed and halted the run
    /// - Validation row-count mismatch
    EtlFailure = 3,

    /// Configuration error (4)
    /// - INI parse failure
    /// - Missing required section or key
    /// - Sort field absent from every target schema
    ConfigError = 4,

    /// Unexpected error (5)
    /// - Panic or unclassified failure
    Unexpected = 5,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get human-readable description of exit code
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::InvalidInput => "Input validation error",
            ExitCode::ConcurrentExecution => "Concurrent execution rejected",
            ExitCode::EtlFailure => "ETL process error",
            ExitCode::ConfigError => "Configuration error",
            ExitCode::Unexpected => "Unexpected error",
        }
    }

    /// Check if this is a success exit code
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }

    /// Check if this is an error exit code
    pub fn is_error(self) -> bool {
        !self.is_success()
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}
