// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Market Data ETL Bootstrap
//!
//! Entry-point concerns kept out of the application core: command-line
//! parsing, exit-code mapping, and the single-instance advisory lock. This
//! crate has no dependency on the domain; the application layer composes
//! both.

pub mod cli;
pub mod exit_code;
pub mod single_instance;

pub use cli::{Cli, CliError};
pub use exit_code::ExitCode;
pub use single_instance::{LockError, SingleInstanceLock, DEFAULT_LOCK_FILE};
