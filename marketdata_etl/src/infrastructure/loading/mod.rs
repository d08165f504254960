// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Staged columnar loading: the loader, the record → column converter, the
//! staging-table scripts, and the session backends.

pub mod column_converter;
pub mod dolphin_loader;
pub mod memory_session;
pub mod session;
pub mod staging;

pub use column_converter::ColumnConverter;
pub use dolphin_loader::DolphinLoader;
pub use memory_session::MemorySession;
pub use session::open_session;
pub use staging::{create_script, drop_script, plan_for_types, staging_table_name, StagingTable};
