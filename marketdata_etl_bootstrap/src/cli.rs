// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Parser
//!
//! Command-line interface parsing using clap.
//!
//! This module defines the CLI structure and performs the syntactic checks
//! the bootstrap layer owns (date shape, config path existence). Semantic
//! validation — calendar validity and range ordering — happens in the
//! application once the domain types are in play. Both classes of failure map
//! to exit code 1.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

/// Main CLI structure
#[derive(Parser, Debug, Clone)]
#[command(name = "marketdata_etl")]
#[command(about = concat!("Market Data ETL v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    /// First date of the inclusive run range, YYYYMMDD
    #[arg(long, value_name = "YYYYMMDD")]
    pub from: String,

    /// Last date of the inclusive run range, YYYYMMDD
    #[arg(long, value_name = "YYYYMMDD")]
    pub to: String,

    /// Path to the INI configuration file
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,
}

/// Syntactic CLI validation failures.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("invalid date '{0}': expected exactly eight digits (YYYYMMDD)")]
    MalformedDate(String),

    #[error("configuration file not found: {0}")]
    ConfigNotFound(PathBuf),
}

impl Cli {
    /// Checks argument shape before the application takes over.
    pub fn validate(&self) -> Result<(), CliError> {
        validate_date_shape(&self.from)?;
        validate_date_shape(&self.to)?;
        if !self.config.is_file() {
            return Err(CliError::ConfigNotFound(self.config.clone()));
        }
        Ok(())
    }
}

/// Eight ASCII digits; calendar validity is checked downstream.
fn validate_date_shape(text: &str) -> Result<(), CliError> {
    if text.len() == 8 && text.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(CliError::MalformedDate(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_required_flags() {
        let cli = Cli::try_parse_from([
            "marketdata_etl",
            "--from",
            "20250101",
            "--to",
            "20250103",
            "--config",
            "etl.ini",
        ])
        .unwrap();
        assert_eq!(cli.from, "20250101");
        assert_eq!(cli.to, "20250103");
        assert_eq!(cli.config, PathBuf::from("etl.ini"));
    }

    #[test]
    fn test_missing_flag_is_rejected() {
        assert!(Cli::try_parse_from(["marketdata_etl", "--from", "20250101"]).is_err());
    }

    #[test]
    fn test_date_shape() {
        assert!(validate_date_shape("20250101").is_ok());
        assert!(validate_date_shape("2025010").is_err());
        assert!(validate_date_shape("202501011").is_err());
        assert!(validate_date_shape("2025-01-1").is_err());
        assert!(validate_date_shape("").is_err());
    }

    #[test]
    fn test_validate_flags_missing_config() {
        let cli = Cli {
            from: "20250101".to_string(),
            to: "20250101".to_string(),
            config: PathBuf::from("/nonexistent/etl.ini"),
        };
        assert!(matches!(cli.validate(), Err(CliError::ConfigNotFound(_))));
    }

    #[test]
    fn test_validate_accepts_existing_config() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let cli = Cli {
            from: "20250101".to_string(),
            to: "20250102".to_string(),
            config: file.path().to_path_buf(),
        };
        cli.validate().unwrap();
    }
}
