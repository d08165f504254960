// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Target Records
//!
//! The storage-tuned record shapes consumed by the loader. Numeric fields are
//! plain primitives initialized to sentinels (`-1` for integers, `NaN` for
//! floats) rather than optionals: the bulk-insert payload is per-column scalar
//! arrays, and sentinels keep that payload uniform without per-value null
//! masking. Text, date, and instant fields default to unassigned.
//!
//! Each target type carries two static tables:
//!
//! - a **column order** (`ColumnSpec` list) — the canonical physical layout
//!   the converter must reproduce exactly;
//! - a **field table** (`FieldDescriptor` list) — name-keyed coercing setters
//!   and getters, the precomputed equivalent of walking the type reflectively
//!   on every record.
//!
//! The mapping engine in `services::transformer` pairs a source's declared
//! fields against the field table; anything it does not assign stays at its
//! sentinel. Target records are never mutated after transformation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::records::columns::{ColumnKind, ColumnSpec};
use crate::records::field_value::{
    coerce_date, coerce_double, coerce_int, coerce_text, coerce_timestamp, CoercionError, FieldValue,
    DOUBLE_SENTINEL, INT_SENTINEL,
};

/// Name-keyed accessor pair for one target field.
///
/// `assign` applies the coercion table and writes the field; `get` reads it
/// back as a `FieldValue` for sorting and column conversion.
pub struct FieldDescriptor<T> {
    pub name: &'static str,
    pub assign: fn(&mut T, FieldValue) -> Result<(), CoercionError>,
    pub get: fn(&T) -> FieldValue,
}

/// A target record type with declared column order and field table.
pub trait MappedTarget: Default + 'static {
    /// Stable type identity; matches the source type it is transformed from
    /// and the `dataType` key in the loader's table mappings.
    const TYPE_NAME: &'static str;

    /// Canonical physical column order.
    fn column_order() -> &'static [ColumnSpec];

    /// Field descriptors, one per column.
    fn field_table() -> &'static [FieldDescriptor<Self>];
}

fn fv_date(v: Option<NaiveDate>) -> FieldValue {
    v.map(FieldValue::Date).unwrap_or(FieldValue::Null)
}

fn fv_symbol(v: &Option<String>) -> FieldValue {
    v.clone().map(FieldValue::Text).unwrap_or(FieldValue::Null)
}

fn fv_instant(v: Option<DateTime<Utc>>) -> FieldValue {
    v.map(FieldValue::Timestamp).unwrap_or(FieldValue::Null)
}

// ---------------------------------------------------------------------------
// XbondQuote
// ---------------------------------------------------------------------------

/// Storage shape of an Xbond quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XbondQuoteTarget {
    pub trade_date: Option<NaiveDate>,
    pub symbol: Option<String>,
    pub quote_id: Option<String>,
    pub bid_price: f64,
    pub bid_yield: f64,
    pub bid_volume: f64,
    pub ask_price: f64,
    pub ask_yield: f64,
    pub ask_volume: f64,
    pub market_depth: i32,
    pub quote_time: Option<DateTime<Utc>>,
    pub receive_time: Option<DateTime<Utc>>,
    /// Loader-only column; no feed counterpart
    pub source_system: Option<String>,
}

impl Default for XbondQuoteTarget {
    fn default() -> Self {
        Self {
            trade_date: None,
            symbol: None,
            quote_id: None,
            bid_price: DOUBLE_SENTINEL,
            bid_yield: DOUBLE_SENTINEL,
            bid_volume: DOUBLE_SENTINEL,
            ask_price: DOUBLE_SENTINEL,
            ask_yield: DOUBLE_SENTINEL,
            ask_volume: DOUBLE_SENTINEL,
            market_depth: INT_SENTINEL,
            quote_time: None,
            receive_time: None,
            source_system: None,
        }
    }
}

impl MappedTarget for XbondQuoteTarget {
    const TYPE_NAME: &'static str = "XbondQuote";

    fn column_order() -> &'static [ColumnSpec] {
        const COLUMNS: &[ColumnSpec] = &[
            ColumnSpec { name: "trade_date", kind: ColumnKind::Date },
            ColumnSpec { name: "symbol", kind: ColumnKind::Symbol },
            ColumnSpec { name: "quote_id", kind: ColumnKind::Symbol },
            ColumnSpec { name: "bid_price", kind: ColumnKind::Double },
            ColumnSpec { name: "bid_yield", kind: ColumnKind::Double },
            ColumnSpec { name: "bid_volume", kind: ColumnKind::Double },
            ColumnSpec { name: "ask_price", kind: ColumnKind::Double },
            ColumnSpec { name: "ask_yield", kind: ColumnKind::Double },
            ColumnSpec { name: "ask_volume", kind: ColumnKind::Double },
            ColumnSpec { name: "market_depth", kind: ColumnKind::Int },
            ColumnSpec { name: "quote_time", kind: ColumnKind::Timestamp },
            ColumnSpec { name: "receive_time", kind: ColumnKind::Timestamp },
            ColumnSpec { name: "source_system", kind: ColumnKind::Symbol },
        ];
        COLUMNS
    }

    fn field_table() -> &'static [FieldDescriptor<Self>] {
        const FIELDS: &[FieldDescriptor<XbondQuoteTarget>] = &[
            FieldDescriptor {
                name: "trade_date",
                assign: |r, v| {
                    r.trade_date = Some(coerce_date(v)?);
                    Ok(())
                },
                get: |r| fv_date(r.trade_date),
            },
            FieldDescriptor {
                name: "symbol",
                assign: |r, v| {
                    r.symbol = Some(coerce_text(v)?);
                    Ok(())
                },
                get: |r| fv_symbol(&r.symbol),
            },
            FieldDescriptor {
                name: "quote_id",
                assign: |r, v| {
                    r.quote_id = Some(coerce_text(v)?);
                    Ok(())
                },
                get: |r| fv_symbol(&r.quote_id),
            },
            FieldDescriptor {
                name: "bid_price",
                assign: |r, v| {
                    r.bid_price = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.bid_price),
            },
            FieldDescriptor {
                name: "bid_yield",
                assign: |r, v| {
                    r.bid_yield = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.bid_yield),
            },
            FieldDescriptor {
                name: "bid_volume",
                assign: |r, v| {
                    r.bid_volume = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.bid_volume),
            },
            FieldDescriptor {
                name: "ask_price",
                assign: |r, v| {
                    r.ask_price = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.ask_price),
            },
            FieldDescriptor {
                name: "ask_yield",
                assign: |r, v| {
                    r.ask_yield = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.ask_yield),
            },
            FieldDescriptor {
                name: "ask_volume",
                assign: |r, v| {
                    r.ask_volume = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.ask_volume),
            },
            FieldDescriptor {
                name: "market_depth",
                assign: |r, v| {
                    r.market_depth = coerce_int(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Int(r.market_depth),
            },
            FieldDescriptor {
                name: "quote_time",
                assign: |r, v| {
                    r.quote_time = Some(coerce_timestamp(v)?);
                    Ok(())
                },
                get: |r| fv_instant(r.quote_time),
            },
            FieldDescriptor {
                name: "receive_time",
                assign: |r, v| {
                    r.receive_time = Some(coerce_timestamp(v)?);
                    Ok(())
                },
                get: |r| fv_instant(r.receive_time),
            },
            FieldDescriptor {
                name: "source_system",
                assign: |r, v| {
                    r.source_system = Some(coerce_text(v)?);
                    Ok(())
                },
                get: |r| fv_symbol(&r.source_system),
            },
        ];
        FIELDS
    }
}

// ---------------------------------------------------------------------------
// XbondTrade
// ---------------------------------------------------------------------------

/// Storage shape of an Xbond trade.
///
/// `price`, `yield_rate`, and `volume` intentionally do not share names with
/// the feed's legacy `trade_*` fields; until the naming question is settled
/// upstream they load as sentinels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XbondTradeTarget {
    pub trade_date: Option<NaiveDate>,
    pub symbol: Option<String>,
    pub side: Option<String>,
    pub settle_type: i32,
    pub price: f64,
    pub yield_rate: f64,
    pub volume: f64,
    pub trade_time: Option<DateTime<Utc>>,
    pub receive_time: Option<DateTime<Utc>>,
    /// Loader-only column; no feed counterpart
    pub source_system: Option<String>,
}

impl Default for XbondTradeTarget {
    fn default() -> Self {
        Self {
            trade_date: None,
            symbol: None,
            side: None,
            settle_type: INT_SENTINEL,
            price: DOUBLE_SENTINEL,
            yield_rate: DOUBLE_SENTINEL,
            volume: DOUBLE_SENTINEL,
            trade_time: None,
            receive_time: None,
            source_system: None,
        }
    }
}

impl MappedTarget for XbondTradeTarget {
    const TYPE_NAME: &'static str = "XbondTrade";

    fn column_order() -> &'static [ColumnSpec] {
        const COLUMNS: &[ColumnSpec] = &[
            ColumnSpec { name: "trade_date", kind: ColumnKind::Date },
            ColumnSpec { name: "symbol", kind: ColumnKind::Symbol },
            ColumnSpec { name: "side", kind: ColumnKind::Symbol },
            ColumnSpec { name: "settle_type", kind: ColumnKind::Int },
            ColumnSpec { name: "price", kind: ColumnKind::Double },
            ColumnSpec { name: "yield_rate", kind: ColumnKind::Double },
            ColumnSpec { name: "volume", kind: ColumnKind::Double },
            ColumnSpec { name: "trade_time", kind: ColumnKind::Timestamp },
            ColumnSpec { name: "receive_time", kind: ColumnKind::Timestamp },
            ColumnSpec { name: "source_system", kind: ColumnKind::Symbol },
        ];
        COLUMNS
    }

    fn field_table() -> &'static [FieldDescriptor<Self>] {
        const FIELDS: &[FieldDescriptor<XbondTradeTarget>] = &[
            FieldDescriptor {
                name: "trade_date",
                assign: |r, v| {
                    r.trade_date = Some(coerce_date(v)?);
                    Ok(())
                },
                get: |r| fv_date(r.trade_date),
            },
            FieldDescriptor {
                name: "symbol",
                assign: |r, v| {
                    r.symbol = Some(coerce_text(v)?);
                    Ok(())
                },
                get: |r| fv_symbol(&r.symbol),
            },
            FieldDescriptor {
                name: "side",
                assign: |r, v| {
                    r.side = Some(coerce_text(v)?);
                    Ok(())
                },
                get: |r| fv_symbol(&r.side),
            },
            FieldDescriptor {
                name: "settle_type",
                assign: |r, v| {
                    r.settle_type = coerce_int(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Int(r.settle_type),
            },
            FieldDescriptor {
                name: "price",
                assign: |r, v| {
                    r.price = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.price),
            },
            FieldDescriptor {
                name: "yield_rate",
                assign: |r, v| {
                    r.yield_rate = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.yield_rate),
            },
            FieldDescriptor {
                name: "volume",
                assign: |r, v| {
                    r.volume = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.volume),
            },
            FieldDescriptor {
                name: "trade_time",
                assign: |r, v| {
                    r.trade_time = Some(coerce_timestamp(v)?);
                    Ok(())
                },
                get: |r| fv_instant(r.trade_time),
            },
            FieldDescriptor {
                name: "receive_time",
                assign: |r, v| {
                    r.receive_time = Some(coerce_timestamp(v)?);
                    Ok(())
                },
                get: |r| fv_instant(r.receive_time),
            },
            FieldDescriptor {
                name: "source_system",
                assign: |r, v| {
                    r.source_system = Some(coerce_text(v)?);
                    Ok(())
                },
                get: |r| fv_symbol(&r.source_system),
            },
        ];
        FIELDS
    }
}

// ---------------------------------------------------------------------------
// BondFutureQuote
// ---------------------------------------------------------------------------

/// Storage shape of a treasury-futures quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondFutureQuoteTarget {
    pub trade_date: Option<NaiveDate>,
    pub symbol: Option<String>,
    pub exchange: Option<String>,
    pub bid_price: f64,
    pub bid_volume: f64,
    pub ask_price: f64,
    pub ask_volume: f64,
    pub last_price: f64,
    pub change_percent: f64,
    pub open_interest: f64,
    pub quote_time: Option<DateTime<Utc>>,
    pub receive_time: Option<DateTime<Utc>>,
    /// Loader-only column; no feed counterpart
    pub source_system: Option<String>,
}

impl Default for BondFutureQuoteTarget {
    fn default() -> Self {
        Self {
            trade_date: None,
            symbol: None,
            exchange: None,
            bid_price: DOUBLE_SENTINEL,
            bid_volume: DOUBLE_SENTINEL,
            ask_price: DOUBLE_SENTINEL,
            ask_volume: DOUBLE_SENTINEL,
            last_price: DOUBLE_SENTINEL,
            change_percent: DOUBLE_SENTINEL,
            open_interest: DOUBLE_SENTINEL,
            quote_time: None,
            receive_time: None,
            source_system: None,
        }
    }
}

impl MappedTarget for BondFutureQuoteTarget {
    const TYPE_NAME: &'static str = "BondFutureQuote";

    fn column_order() -> &'static [ColumnSpec] {
        const COLUMNS: &[ColumnSpec] = &[
            ColumnSpec { name: "trade_date", kind: ColumnKind::Date },
            ColumnSpec { name: "symbol", kind: ColumnKind::Symbol },
            ColumnSpec { name: "exchange", kind: ColumnKind::Symbol },
            ColumnSpec { name: "bid_price", kind: ColumnKind::Double },
            ColumnSpec { name: "bid_volume", kind: ColumnKind::Double },
            ColumnSpec { name: "ask_price", kind: ColumnKind::Double },
            ColumnSpec { name: "ask_volume", kind: ColumnKind::Double },
            ColumnSpec { name: "last_price", kind: ColumnKind::Double },
            ColumnSpec { name: "change_percent", kind: ColumnKind::Double },
            ColumnSpec { name: "open_interest", kind: ColumnKind::Double },
            ColumnSpec { name: "quote_time", kind: ColumnKind::Timestamp },
            ColumnSpec { name: "receive_time", kind: ColumnKind::Timestamp },
            ColumnSpec { name: "source_system", kind: ColumnKind::Symbol },
        ];
        COLUMNS
    }

    fn field_table() -> &'static [FieldDescriptor<Self>] {
        const FIELDS: &[FieldDescriptor<BondFutureQuoteTarget>] = &[
            FieldDescriptor {
                name: "trade_date",
                assign: |r, v| {
                    r.trade_date = Some(coerce_date(v)?);
                    Ok(())
                },
                get: |r| fv_date(r.trade_date),
            },
            FieldDescriptor {
                name: "symbol",
                assign: |r, v| {
                    r.symbol = Some(coerce_text(v)?);
                    Ok(())
                },
                get: |r| fv_symbol(&r.symbol),
            },
            FieldDescriptor {
                name: "exchange",
                assign: |r, v| {
                    r.exchange = Some(coerce_text(v)?);
                    Ok(())
                },
                get: |r| fv_symbol(&r.exchange),
            },
            FieldDescriptor {
                name: "bid_price",
                assign: |r, v| {
                    r.bid_price = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.bid_price),
            },
            FieldDescriptor {
                name: "bid_volume",
                assign: |r, v| {
                    r.bid_volume = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.bid_volume),
            },
            FieldDescriptor {
                name: "ask_price",
                assign: |r, v| {
                    r.ask_price = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.ask_price),
            },
            FieldDescriptor {
                name: "ask_volume",
                assign: |r, v| {
                    r.ask_volume = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.ask_volume),
            },
            FieldDescriptor {
                name: "last_price",
                assign: |r, v| {
                    r.last_price = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.last_price),
            },
            FieldDescriptor {
                name: "change_percent",
                assign: |r, v| {
                    r.change_percent = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.change_percent),
            },
            FieldDescriptor {
                name: "open_interest",
                assign: |r, v| {
                    r.open_interest = coerce_double(v)?;
                    Ok(())
                },
                get: |r| FieldValue::Double(r.open_interest),
            },
            FieldDescriptor {
                name: "quote_time",
                assign: |r, v| {
                    r.quote_time = Some(coerce_timestamp(v)?);
                    Ok(())
                },
                get: |r| fv_instant(r.quote_time),
            },
            FieldDescriptor {
                name: "receive_time",
                assign: |r, v| {
                    r.receive_time = Some(coerce_timestamp(v)?);
                    Ok(())
                },
                get: |r| fv_instant(r.receive_time),
            },
            FieldDescriptor {
                name: "source_system",
                assign: |r, v| {
                    r.source_system = Some(coerce_text(v)?);
                    Ok(())
                },
                get: |r| fv_symbol(&r.source_system),
            },
        ];
        FIELDS
    }
}

// ---------------------------------------------------------------------------
// Polymorphic wrapper
// ---------------------------------------------------------------------------

/// Polymorphic target record, partitioned by type name for loading.
///
/// Externally tagged so the sorter's bincode spill frames round-trip; the
/// internally-tagged form would require a self-describing format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetRecord {
    XbondQuote(XbondQuoteTarget),
    XbondTrade(XbondTradeTarget),
    BondFutureQuote(BondFutureQuoteTarget),
}

fn lookup<T: MappedTarget>(record: &T, field: &str) -> Option<FieldValue> {
    T::field_table()
        .iter()
        .find(|d| d.name == field)
        .map(|d| (d.get)(record))
}

impl TargetRecord {
    /// Stable type identity; the loader's partition and dispatch key.
    pub fn type_name(&self) -> &'static str {
        match self {
            TargetRecord::XbondQuote(_) => XbondQuoteTarget::TYPE_NAME,
            TargetRecord::XbondTrade(_) => XbondTradeTarget::TYPE_NAME,
            TargetRecord::BondFutureQuote(_) => BondFutureQuoteTarget::TYPE_NAME,
        }
    }

    /// Reads a field by name for sort-key extraction; `None` when the field
    /// is not declared by this record's type.
    pub fn sort_value(&self, field: &str) -> Option<FieldValue> {
        match self {
            TargetRecord::XbondQuote(r) => lookup(r, field),
            TargetRecord::XbondTrade(r) => lookup(r, field),
            TargetRecord::BondFutureQuote(r) => lookup(r, field),
        }
    }

    /// Whether this record's type declares the named field.
    pub fn declares_field(&self, field: &str) -> bool {
        self.sort_value(field).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_defaults_are_sentinels() {
        let quote = XbondQuoteTarget::default();
        assert!(quote.bid_price.is_nan());
        assert!(quote.ask_volume.is_nan());
        assert_eq!(quote.market_depth, INT_SENTINEL);
        assert!(quote.symbol.is_none());
        assert!(quote.trade_date.is_none());
        assert!(quote.receive_time.is_none());

        let trade = XbondTradeTarget::default();
        assert_eq!(trade.settle_type, INT_SENTINEL);
        assert!(trade.price.is_nan());
    }

    #[test]
    fn test_column_order_matches_field_table() {
        fn check<T: MappedTarget>() {
            let columns = T::column_order();
            let fields = T::field_table();
            assert_eq!(columns.len(), fields.len());
            for (column, field) in columns.iter().zip(fields.iter()) {
                assert_eq!(column.name, field.name);
            }
        }
        check::<XbondQuoteTarget>();
        check::<XbondTradeTarget>();
        check::<BondFutureQuoteTarget>();
    }

    #[test]
    fn test_assign_and_get_round_trip() {
        let mut record = XbondQuoteTarget::default();
        let descriptor = XbondQuoteTarget::field_table()
            .iter()
            .find(|d| d.name == "bid_price")
            .unwrap();
        (descriptor.assign)(&mut record, FieldValue::Double(101.25)).unwrap();
        assert_eq!((descriptor.get)(&record), FieldValue::Double(101.25));
    }

    #[test]
    fn test_sort_value_by_name() {
        let record = TargetRecord::XbondQuote(XbondQuoteTarget {
            symbol: Some("240006.IB".to_string()),
            ..Default::default()
        });
        assert_eq!(
            record.sort_value("symbol"),
            Some(FieldValue::Text("240006.IB".to_string()))
        );
        assert_eq!(record.sort_value("receive_time"), Some(FieldValue::Null));
        assert_eq!(record.sort_value("no_such_field"), None);
    }

    #[test]
    fn test_trade_date_assignment_from_text() {
        let mut record = XbondTradeTarget::default();
        let descriptor = XbondTradeTarget::field_table()
            .iter()
            .find(|d| d.name == "trade_date")
            .unwrap();
        (descriptor.assign)(&mut record, FieldValue::Text("2025.01.02".to_string())).unwrap();
        assert_eq!(record.trade_date, NaiveDate::from_ymd_opt(2025, 1, 2));
    }

    #[test]
    fn test_all_types_declare_sort_fields() {
        for record in [
            TargetRecord::XbondQuote(XbondQuoteTarget::default()),
            TargetRecord::XbondTrade(XbondTradeTarget::default()),
            TargetRecord::BondFutureQuote(BondFutureQuoteTarget::default()),
        ] {
            assert!(record.declares_field("receive_time"));
            assert!(record.declares_field("symbol"));
        }
    }
}
