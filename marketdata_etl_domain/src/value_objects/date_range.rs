// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Date Range Value Object
//!
//! An inclusive, ordered range of calendar dates. The workflow engine iterates
//! this range to drive the multi-day loop; construction rejects an inverted
//! range so no day ever runs for invalid input.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EtlError;
use crate::value_objects::trade_date::TradeDate;

/// Inclusive range `[from, to]` of trade dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    from: TradeDate,
    to: TradeDate,
}

impl DateRange {
    /// Builds a range, rejecting `from > to`.
    pub fn new(from: TradeDate, to: TradeDate) -> Result<Self, EtlError> {
        if from > to {
            return Err(EtlError::invalid_input(format!(
                "invalid range: from {} is after to {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// First date of the range.
    pub fn from(&self) -> TradeDate {
        self.from
    }

    /// Last date of the range (inclusive).
    pub fn to(&self) -> TradeDate {
        self.to
    }

    /// Number of calendar days in the range.
    pub fn days(&self) -> u64 {
        (self.to.as_naive() - self.from.as_naive()).num_days() as u64 + 1
    }

    /// Iterates the dates in ascending order.
    pub fn iter(&self) -> DateRangeIter {
        DateRangeIter {
            next: Some(self.from),
            last: self.to,
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

/// Ascending iterator over a `DateRange`.
pub struct DateRangeIter {
    next: Option<TradeDate>,
    last: TradeDate,
}

impl Iterator for DateRangeIter {
    type Item = TradeDate;

    fn next(&mut self) -> Option<TradeDate> {
        let current = self.next?;
        self.next = if current < self.last { current.succ() } else { None };
        Some(current)
    }
}

impl IntoIterator for &DateRange {
    type Item = TradeDate;
    type IntoIter = DateRangeIter;

    fn into_iter(self) -> DateRangeIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> TradeDate {
        TradeDate::parse(s).unwrap()
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::new(date("20250101"), date("20250101")).unwrap();
        let days: Vec<_> = range.iter().collect();
        assert_eq!(days, vec![date("20250101")]);
        assert_eq!(range.days(), 1);
    }

    #[test]
    fn test_multi_day_range_is_inclusive_and_ordered() {
        let range = DateRange::new(date("20250130"), date("20250202")).unwrap();
        let days: Vec<_> = range.iter().collect();
        assert_eq!(
            days,
            vec![date("20250130"), date("20250131"), date("20250201"), date("20250202")]
        );
        assert_eq!(range.days(), 4);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = DateRange::new(date("20250102"), date("20250101")).unwrap_err();
        assert_eq!(err.category(), "input");
    }

    #[test]
    fn test_crosses_month_and_year_boundaries() {
        let range = DateRange::new(date("20241230"), date("20250102")).unwrap();
        assert_eq!(range.days(), 4);
        let days: Vec<_> = range.iter().collect();
        assert_eq!(days.last().unwrap(), &date("20250102"));
    }

    proptest::proptest! {
        #[test]
        fn prop_iteration_matches_day_count(start in 0u32..20_000, span in 0u32..400) {
            let epoch = chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
            let from = TradeDate::new(epoch + chrono::Duration::days(start as i64));
            let to = TradeDate::new(epoch + chrono::Duration::days((start + span) as i64));
            let range = DateRange::new(from, to).unwrap();

            let days: Vec<_> = range.iter().collect();
            proptest::prop_assert_eq!(days.len() as u64, range.days());
            proptest::prop_assert_eq!(days.first().copied(), Some(from));
            proptest::prop_assert_eq!(days.last().copied(), Some(to));
            // Strictly ascending, one day at a time
            for pair in days.windows(2) {
                proptest::prop_assert_eq!(pair[0].succ(), Some(pair[1]));
            }
        }
    }
}
