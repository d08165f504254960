// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Infrastructure layer: configuration, observability, sorting, loading, and
//! the built-in adapters behind the domain ports.

pub mod adapters;
pub mod config;
pub mod loading;
pub mod logging;
pub mod sorting;
