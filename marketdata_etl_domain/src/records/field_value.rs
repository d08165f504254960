// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Field Values and Coercion
//!
//! `FieldValue` is the typed unit exchanged between a source record's declared
//! fields and a target record's field descriptors. The coercion functions
//! implement the mapping table:
//!
//! | source            | target            | rule                                  |
//! |-------------------|-------------------|---------------------------------------|
//! | null              | any               | keep the target sentinel              |
//! | `Int`             | integer           | unbox                                 |
//! | `Long`            | floating          | widen                                 |
//! | `Double`          | floating          | unbox                                 |
//! | `Text`            | text              | direct                                |
//! | `Text` (date)     | calendar date     | parse `YYYY.MM.DD` / `YYYYMMDD`; malformed fails the record |
//! | `LocalDateTime`   | instant           | interpret in the system time zone     |
//!
//! Any pairing outside the table is `Incompatible`: the caller logs it and
//! keeps the sentinel, the record does not fail. Sentinels are `-1` for
//! integer fields and `NaN` for floating fields; text, date, and instant
//! fields default to unassigned (`None`).

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::cmp::Ordering;

/// Sentinel for unassigned integer target fields.
pub const INT_SENTINEL: i32 = -1;

/// Sentinel for unassigned floating target fields.
pub const DOUBLE_SENTINEL: f64 = f64::NAN;

/// A typed field value read from a source record or a target record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent value; targets keep their sentinel
    Null,
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer (volume fields)
    Long(i64),
    /// 64-bit float
    Double(f64),
    /// Free text or symbol
    Text(String),
    /// Calendar date
    Date(NaiveDate),
    /// Wall-clock datetime without zone, as emitted by the feeds
    LocalDateTime(NaiveDateTime),
    /// Absolute instant
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Whether this value is absent.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Int(_) => "int",
            FieldValue::Long(_) => "long",
            FieldValue::Double(_) => "double",
            FieldValue::Text(_) => "text",
            FieldValue::Date(_) => "date",
            FieldValue::LocalDateTime(_) => "local_datetime",
            FieldValue::Timestamp(_) => "timestamp",
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Int(_) => 1,
            FieldValue::Long(_) => 2,
            FieldValue::Double(_) => 3,
            FieldValue::Text(_) => 4,
            FieldValue::Date(_) => 5,
            FieldValue::LocalDateTime(_) => 6,
            FieldValue::Timestamp(_) => 7,
        }
    }
}

/// Why a coercion did not assign.
#[derive(Debug, Clone, PartialEq)]
pub enum CoercionError {
    /// Source kind has no rule for the target kind; caller keeps the sentinel
    Incompatible {
        expected: &'static str,
        actual: &'static str,
    },
    /// A date text matched neither accepted format; fails the record
    MalformedDate(String),
}

/// Coerces into an integer target field.
pub fn coerce_int(value: FieldValue) -> Result<i32, CoercionError> {
    match value {
        FieldValue::Int(v) => Ok(v),
        other => Err(CoercionError::Incompatible {
            expected: "int",
            actual: other.kind(),
        }),
    }
}

/// Coerces into a floating target field; longs widen.
pub fn coerce_double(value: FieldValue) -> Result<f64, CoercionError> {
    match value {
        FieldValue::Double(v) => Ok(v),
        FieldValue::Long(v) => Ok(v as f64),
        other => Err(CoercionError::Incompatible {
            expected: "double",
            actual: other.kind(),
        }),
    }
}

/// Coerces into a text target field.
pub fn coerce_text(value: FieldValue) -> Result<String, CoercionError> {
    match value {
        FieldValue::Text(v) => Ok(v),
        other => Err(CoercionError::Incompatible {
            expected: "text",
            actual: other.kind(),
        }),
    }
}

/// Coerces into a calendar-date target field. Date-formatted text is parsed;
/// malformed text fails the whole record.
pub fn coerce_date(value: FieldValue) -> Result<NaiveDate, CoercionError> {
    match value {
        FieldValue::Date(v) => Ok(v),
        FieldValue::Text(s) => parse_date_text(&s),
        other => Err(CoercionError::Incompatible {
            expected: "date",
            actual: other.kind(),
        }),
    }
}

/// Coerces into an instant target field, interpreting wall-clock datetimes in
/// the system time zone.
pub fn coerce_timestamp(value: FieldValue) -> Result<DateTime<Utc>, CoercionError> {
    match value {
        FieldValue::Timestamp(v) => Ok(v),
        FieldValue::LocalDateTime(v) => Ok(local_to_instant(v)),
        other => Err(CoercionError::Incompatible {
            expected: "timestamp",
            actual: other.kind(),
        }),
    }
}

/// Parses the two accepted date-text formats.
pub fn parse_date_text(text: &str) -> Result<NaiveDate, CoercionError> {
    NaiveDate::parse_from_str(text, "%Y.%m.%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y%m%d"))
        .map_err(|_| CoercionError::MalformedDate(text.to_string()))
}

/// Interprets a wall-clock datetime in the system time zone. An ambiguous
/// local time resolves to the earlier instant; a nonexistent one (DST gap)
/// falls back to the UTC reading.
pub fn local_to_instant(datetime: NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&datetime)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&datetime))
}

/// Total order over field values used by the sorter.
///
/// Values of the same kind compare naturally (`NaN` through `total_cmp`);
/// mixed kinds order by kind rank so the comparison is total. Sort keys are
/// null-free by the time they reach the sorter, so `Null` ordering first is
/// only a defensive default.
pub fn cmp_field_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::Int(x), FieldValue::Int(y)) => x.cmp(y),
        (FieldValue::Long(x), FieldValue::Long(y)) => x.cmp(y),
        (FieldValue::Double(x), FieldValue::Double(y)) => x.total_cmp(y),
        (FieldValue::Text(x), FieldValue::Text(y)) => x.cmp(y),
        (FieldValue::Date(x), FieldValue::Date(y)) => x.cmp(y),
        (FieldValue::LocalDateTime(x), FieldValue::LocalDateTime(y)) => x.cmp(y),
        (FieldValue::Timestamp(x), FieldValue::Timestamp(y)) => x.cmp(y),
        _ => a.kind_rank().cmp(&b.kind_rank()),
    }
}

/// Lexicographic comparison of composite sort keys.
pub fn cmp_sort_keys(a: &[FieldValue], b: &[FieldValue]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = cmp_field_values(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}
