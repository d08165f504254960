// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Market Data ETL CLI
//!
//! Entry point of the batch engine:
//!
//! ```bash
//! marketdata_etl --from 20250101 --to 20250131 --config etl.ini
//! ```
//!
//! Exit codes: 0 success, 1 input validation, 2 concurrent execution, 3 ETL
//! process error, 4 configuration error, 5 unexpected.

use clap::Parser;
use tracing::error;

use marketdata_etl::infrastructure::logging::init_logging;
use marketdata_etl::{EtlApplication, EtlConfig};
use marketdata_etl_bootstrap::{Cli, ExitCode};
use marketdata_etl_domain::{DateRange, EtlError, TradeDate};

fn main() {
    let code = std::panic::catch_unwind(|| match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime.block_on(run()),
        Err(err) => {
            eprintln!("cannot start runtime: {}", err);
            ExitCode::Unexpected
        }
    })
    .unwrap_or(ExitCode::Unexpected);
    std::process::exit(code.as_i32());
}

async fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::Success
                }
                _ => ExitCode::InvalidInput,
            };
            let _ = err.print();
            return code;
        }
    };

    if let Err(err) = cli.validate() {
        eprintln!("{}", err);
        return ExitCode::InvalidInput;
    }
    let range = match parse_range(&cli.from, &cli.to) {
        Ok(range) => range,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::InvalidInput;
        }
    };

    let config = match EtlConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::ConfigError;
        }
    };
    if let Err(err) = init_logging(&config.logging) {
        eprintln!("{}", err);
        return ExitCode::ConfigError;
    }

    let application = match EtlApplication::build(config) {
        Ok(application) => application,
        Err(err) => {
            error!("{}", err);
            eprintln!("{}", err);
            return exit_code_for(&err);
        }
    };

    match application.run(range).await {
        Ok(result) if result.halted() => ExitCode::EtlFailure,
        Ok(_) => ExitCode::Success,
        Err(err) => {
            error!("{}", err);
            eprintln!("{}", err);
            exit_code_for(&err)
        }
    }
}

fn parse_range(from: &str, to: &str) -> Result<DateRange, EtlError> {
    DateRange::new(TradeDate::parse(from)?, TradeDate::parse(to)?)
}

fn exit_code_for(err: &EtlError) -> ExitCode {
    match err.category() {
        "input" => ExitCode::InvalidInput,
        "configuration" => ExitCode::ConfigError,
        "concurrency" => ExitCode::ConcurrentExecution,
        "internal" => ExitCode::Unexpected,
        _ => ExitCode::EtlFailure,
    }
}
