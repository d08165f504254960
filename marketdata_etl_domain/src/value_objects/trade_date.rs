// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Trade Date Value Object
//!
//! A validated calendar date in the market-data domain. Two wire formats are
//! accepted, matching the formats the upstream feeds emit:
//!
//! - compact: `YYYYMMDD` (CLI arguments, file names)
//! - dotted: `YYYY.MM.DD` (feed payloads)
//!
//! Display renders the compact form.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EtlError;

/// A single calendar date of market data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeDate(NaiveDate);

impl TradeDate {
    /// Wraps an already-validated calendar date.
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parses `YYYYMMDD` or `YYYY.MM.DD`.
    pub fn parse(text: &str) -> Result<Self, EtlError> {
        NaiveDate::parse_from_str(text, "%Y%m%d")
            .or_else(|_| NaiveDate::parse_from_str(text, "%Y.%m.%d"))
            .map(Self)
            .map_err(|_| {
                EtlError::invalid_input(format!(
                    "invalid date '{}': expected YYYYMMDD or YYYY.MM.DD",
                    text
                ))
            })
    }

    /// The underlying calendar date.
    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// Compact `YYYYMMDD` rendering.
    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// The next calendar day, if representable.
    pub fn succ(&self) -> Option<TradeDate> {
        self.0.succ_opt().map(Self)
    }
}

impl fmt::Display for TradeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.compact())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compact() {
        let date = TradeDate::parse("20250101").unwrap();
        assert_eq!(date.as_naive(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn test_parse_dotted() {
        let date = TradeDate::parse("2025.03.15").unwrap();
        assert_eq!(date.as_naive(), NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(TradeDate::parse("2025-01-01").is_err());
        assert!(TradeDate::parse("20251301").is_err());
        assert!(TradeDate::parse("20250230").is_err());
        assert!(TradeDate::parse("").is_err());
        assert!(TradeDate::parse("yesterday").is_err());
    }

    #[test]
    fn test_display_is_compact() {
        let date = TradeDate::parse("2025.01.02").unwrap();
        assert_eq!(date.to_string(), "20250102");
    }

    #[test]
    fn test_ordering() {
        let earlier = TradeDate::parse("20250101").unwrap();
        let later = TradeDate::parse("20250102").unwrap();
        assert!(earlier < later);
        assert_eq!(earlier.succ().unwrap(), later);
    }
}
