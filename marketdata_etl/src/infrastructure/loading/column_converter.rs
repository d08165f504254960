// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Column Converter
//!
//! Turns a uniform partition of target records into per-column scalar arrays
//! matching the type's declared column order exactly. Sentinels pass through
//! as-is (`-1` stays `-1`, `NaN` stays `NaN`); downstream consumers treat
//! them as null. A mixed partition, a column without a descriptor, or a
//! kind mismatch between the declared column and the stored value is a
//! programming error and aborts the load.

use marketdata_etl_domain::records::field_value::FieldValue;
use marketdata_etl_domain::records::{
    BondFutureQuoteTarget, Column, ColumnKind, ColumnValues, MappedTarget, TargetRecord,
    XbondQuoteTarget, XbondTradeTarget,
};
use marketdata_etl_domain::EtlError;

/// Record-list → column-array conversion.
pub struct ColumnConverter;

impl ColumnConverter {
    /// Builds one column array per declared column, in declared order.
    pub fn to_columns(records: &[TargetRecord]) -> Result<Vec<Column>, EtlError> {
        let first = records
            .first()
            .ok_or_else(|| EtlError::internal_error("column conversion of an empty partition"))?;
        match first {
            TargetRecord::XbondQuote(_) => {
                convert::<XbondQuoteTarget>(collect_variant(records, |r| match r {
                    TargetRecord::XbondQuote(inner) => Some(inner),
                    _ => None,
                })?)
            }
            TargetRecord::XbondTrade(_) => {
                convert::<XbondTradeTarget>(collect_variant(records, |r| match r {
                    TargetRecord::XbondTrade(inner) => Some(inner),
                    _ => None,
                })?)
            }
            TargetRecord::BondFutureQuote(_) => {
                convert::<BondFutureQuoteTarget>(collect_variant(records, |r| match r {
                    TargetRecord::BondFutureQuote(inner) => Some(inner),
                    _ => None,
                })?)
            }
        }
    }
}

fn collect_variant<'a, T>(
    records: &'a [TargetRecord],
    project: fn(&'a TargetRecord) -> Option<&'a T>,
) -> Result<Vec<&'a T>, EtlError> {
    records
        .iter()
        .map(|record| {
            project(record).ok_or_else(|| {
                EtlError::internal_error(format!(
                    "mixed partition: unexpected {} record",
                    record.type_name()
                ))
            })
        })
        .collect()
}

fn convert<T: MappedTarget>(items: Vec<&T>) -> Result<Vec<Column>, EtlError> {
    T::column_order()
        .iter()
        .map(|spec| {
            let descriptor = T::field_table()
                .iter()
                .find(|d| d.name == spec.name)
                .ok_or_else(|| {
                    EtlError::internal_error(format!(
                        "declared column '{}' has no field descriptor on {}",
                        spec.name,
                        T::TYPE_NAME
                    ))
                })?;

            let values = match spec.kind {
                ColumnKind::Date => ColumnValues::Date(
                    items
                        .iter()
                        .map(|item| match (descriptor.get)(item) {
                            FieldValue::Date(v) => Ok(Some(v)),
                            FieldValue::Null => Ok(None),
                            other => Err(kind_mismatch(spec.name, "date", &other)),
                        })
                        .collect::<Result<_, _>>()?,
                ),
                ColumnKind::Symbol => ColumnValues::Symbol(
                    items
                        .iter()
                        .map(|item| match (descriptor.get)(item) {
                            FieldValue::Text(v) => Ok(Some(v)),
                            FieldValue::Null => Ok(None),
                            other => Err(kind_mismatch(spec.name, "text", &other)),
                        })
                        .collect::<Result<_, _>>()?,
                ),
                ColumnKind::Int => ColumnValues::Int(
                    items
                        .iter()
                        .map(|item| match (descriptor.get)(item) {
                            FieldValue::Int(v) => Ok(v),
                            other => Err(kind_mismatch(spec.name, "int", &other)),
                        })
                        .collect::<Result<_, _>>()?,
                ),
                ColumnKind::Double => ColumnValues::Double(
                    items
                        .iter()
                        .map(|item| match (descriptor.get)(item) {
                            FieldValue::Double(v) => Ok(v),
                            other => Err(kind_mismatch(spec.name, "double", &other)),
                        })
                        .collect::<Result<_, _>>()?,
                ),
                ColumnKind::Timestamp => ColumnValues::Timestamp(
                    items
                        .iter()
                        .map(|item| match (descriptor.get)(item) {
                            FieldValue::Timestamp(v) => Ok(Some(v)),
                            FieldValue::Null => Ok(None),
                            other => Err(kind_mismatch(spec.name, "timestamp", &other)),
                        })
                        .collect::<Result<_, _>>()?,
                ),
            };

            Ok(Column {
                name: spec.name.to_string(),
                values,
            })
        })
        .collect()
}

fn kind_mismatch(column: &str, expected: &str, actual: &FieldValue) -> EtlError {
    EtlError::internal_error(format!(
        "column '{}' declared {} but holds {}",
        column,
        expected,
        actual.kind()
    ))
}
