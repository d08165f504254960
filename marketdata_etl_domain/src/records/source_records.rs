// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Source Records
//!
//! The raw record shapes produced by extractors: interbank cash-bond (Xbond)
//! quotes and trades, and treasury-futures quotes. Every field is optional
//! because the upstream feeds routinely omit values; the transformer maps
//! whatever is present onto the storage-tuned target shapes by field name.
//!
//! Each variant exposes a stable type name (the transformer registry's
//! dispatch key) and an ordered list of `(name, value)` pairs — the declared
//! fields the mapping engine walks. Source records are never mutated after
//! extraction.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::records::field_value::FieldValue;

/// Ordered view of a record's declared fields, consumed by the mapper.
pub trait SourceFields {
    /// `(field name, value)` pairs in declaration order; absent values are
    /// `FieldValue::Null`.
    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)>;
}

fn fv_int(v: Option<i32>) -> FieldValue {
    v.map(FieldValue::Int).unwrap_or(FieldValue::Null)
}

fn fv_long(v: Option<i64>) -> FieldValue {
    v.map(FieldValue::Long).unwrap_or(FieldValue::Null)
}

fn fv_double(v: Option<f64>) -> FieldValue {
    v.map(FieldValue::Double).unwrap_or(FieldValue::Null)
}

fn fv_text(v: &Option<String>) -> FieldValue {
    v.clone().map(FieldValue::Text).unwrap_or(FieldValue::Null)
}

fn fv_local(v: Option<NaiveDateTime>) -> FieldValue {
    v.map(FieldValue::LocalDateTime).unwrap_or(FieldValue::Null)
}

/// Two-sided quote from the Xbond cash-bond feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XbondQuoteSource {
    pub symbol: Option<String>,
    /// Feed-format date text, `YYYY.MM.DD` or `YYYYMMDD`
    pub trade_date: Option<String>,
    pub quote_id: Option<String>,
    pub bid_price: Option<f64>,
    pub bid_yield: Option<f64>,
    pub bid_volume: Option<i64>,
    pub ask_price: Option<f64>,
    pub ask_yield: Option<f64>,
    pub ask_volume: Option<i64>,
    pub market_depth: Option<i32>,
    pub quote_time: Option<NaiveDateTime>,
    pub receive_time: Option<NaiveDateTime>,
}

impl SourceFields for XbondQuoteSource {
    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("symbol", fv_text(&self.symbol)),
            ("trade_date", fv_text(&self.trade_date)),
            ("quote_id", fv_text(&self.quote_id)),
            ("bid_price", fv_double(self.bid_price)),
            ("bid_yield", fv_double(self.bid_yield)),
            ("bid_volume", fv_long(self.bid_volume)),
            ("ask_price", fv_double(self.ask_price)),
            ("ask_yield", fv_double(self.ask_yield)),
            ("ask_volume", fv_long(self.ask_volume)),
            ("market_depth", fv_int(self.market_depth)),
            ("quote_time", fv_local(self.quote_time)),
            ("receive_time", fv_local(self.receive_time)),
        ]
    }
}

/// Executed trade from the Xbond cash-bond feed.
///
/// The feed still carries the legacy `trade_*` price fields. Their storage
/// counterparts were renamed (`price`, `yield_rate`, `volume`), so these four
/// have no same-name target and fall under the unmapped-field policy of the
/// transform configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XbondTradeSource {
    pub symbol: Option<String>,
    pub trade_date: Option<String>,
    pub side: Option<String>,
    pub settle_type: Option<i32>,
    pub trade_price: Option<f64>,
    pub trade_yield: Option<f64>,
    pub trade_volume: Option<i64>,
    pub trade_id: Option<String>,
    pub trade_time: Option<NaiveDateTime>,
    pub receive_time: Option<NaiveDateTime>,
}

impl SourceFields for XbondTradeSource {
    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("symbol", fv_text(&self.symbol)),
            ("trade_date", fv_text(&self.trade_date)),
            ("side", fv_text(&self.side)),
            ("settle_type", fv_int(self.settle_type)),
            ("trade_price", fv_double(self.trade_price)),
            ("trade_yield", fv_double(self.trade_yield)),
            ("trade_volume", fv_long(self.trade_volume)),
            ("trade_id", fv_text(&self.trade_id)),
            ("trade_time", fv_local(self.trade_time)),
            ("receive_time", fv_local(self.receive_time)),
        ]
    }
}

/// Two-sided quote from the treasury-futures feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BondFutureQuoteSource {
    pub symbol: Option<String>,
    pub trade_date: Option<String>,
    pub exchange: Option<String>,
    pub bid_price: Option<f64>,
    pub bid_volume: Option<i64>,
    pub ask_price: Option<f64>,
    pub ask_volume: Option<i64>,
    pub last_price: Option<f64>,
    pub change_percent: Option<f64>,
    pub open_interest: Option<i64>,
    pub quote_time: Option<NaiveDateTime>,
    pub receive_time: Option<NaiveDateTime>,
}

impl SourceFields for BondFutureQuoteSource {
    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("symbol", fv_text(&self.symbol)),
            ("trade_date", fv_text(&self.trade_date)),
            ("exchange", fv_text(&self.exchange)),
            ("bid_price", fv_double(self.bid_price)),
            ("bid_volume", fv_long(self.bid_volume)),
            ("ask_price", fv_double(self.ask_price)),
            ("ask_volume", fv_long(self.ask_volume)),
            ("last_price", fv_double(self.last_price)),
            ("change_percent", fv_double(self.change_percent)),
            ("open_interest", fv_long(self.open_interest)),
            ("quote_time", fv_local(self.quote_time)),
            ("receive_time", fv_local(self.receive_time)),
        ]
    }
}

/// Polymorphic source record, dispatched to a transformer by type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SourceRecord {
    XbondQuote(XbondQuoteSource),
    XbondTrade(XbondTradeSource),
    BondFutureQuote(BondFutureQuoteSource),
}

impl SourceRecord {
    /// Stable type identity used for registry dispatch and grouping.
    pub fn type_name(&self) -> &'static str {
        match self {
            SourceRecord::XbondQuote(_) => "XbondQuote",
            SourceRecord::XbondTrade(_) => "XbondTrade",
            SourceRecord::BondFutureQuote(_) => "BondFutureQuote",
        }
    }
}

impl SourceFields for SourceRecord {
    fn declared_fields(&self) -> Vec<(&'static str, FieldValue)> {
        match self {
            SourceRecord::XbondQuote(r) => r.declared_fields(),
            SourceRecord::XbondTrade(r) => r.declared_fields(),
            SourceRecord::BondFutureQuote(r) => r.declared_fields(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_are_stable() {
        assert_eq!(
            SourceRecord::XbondQuote(XbondQuoteSource::default()).type_name(),
            "XbondQuote"
        );
        assert_eq!(
            SourceRecord::XbondTrade(XbondTradeSource::default()).type_name(),
            "XbondTrade"
        );
        assert_eq!(
            SourceRecord::BondFutureQuote(BondFutureQuoteSource::default()).type_name(),
            "BondFutureQuote"
        );
    }

    #[test]
    fn test_default_record_declares_all_fields_null() {
        let fields = XbondQuoteSource::default().declared_fields();
        assert_eq!(fields.len(), 12);
        assert!(fields.iter().all(|(_, v)| v.is_null()));
    }

    #[test]
    fn test_declared_fields_carry_values() {
        let record = XbondTradeSource {
            symbol: Some("230012.IB".to_string()),
            trade_volume: Some(50_000_000),
            ..Default::default()
        };
        let fields = record.declared_fields();
        assert!(fields.contains(&("symbol", FieldValue::Text("230012.IB".to_string()))));
        assert!(fields.contains(&("trade_volume", FieldValue::Long(50_000_000))));
    }
}
