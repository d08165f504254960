// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Market Data ETL Engine
//!
//! Daily-batch ETL for bond-market data. For each calendar date in an
//! inclusive range the engine runs a five-phase pipeline — Extract →
//! Transform → Load → Validate → Clean — where every phase must finish
//! before the next begins, a failure in any phase halts the day, and a failed
//! day halts the run.
//!
//! ## Layers
//!
//! - **application**: the workflow engine, per-day workflow, phase executor,
//!   transform fan-out, and the five phase implementations
//! - **infrastructure**: INI configuration, tracing setup, the
//!   memory-bounded external sorter, column conversion, staging scripts, the
//!   loader, and the built-in port adapters
//!
//! Domain types (context, phases, records, ports) live in
//! [`marketdata_etl_domain`]; entry-point concerns (CLI, exit codes, the
//! single-instance lock) in `marketdata_etl_bootstrap`.

pub mod application;
pub mod infrastructure;

pub use application::EtlApplication;
pub use infrastructure::config::EtlConfig;
