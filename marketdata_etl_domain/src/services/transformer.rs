// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transformer Service
//!
//! One-to-one mapping of source records onto target records, dispatched by
//! source type through the registry. The shared mapping engine walks a
//! source's declared fields against the target's static field table:
//!
//! - same-name field present and non-null → assign with coercion
//! - absent or null → target keeps its sentinel
//! - incompatible kinds → counted per field, sentinel kept, record survives
//! - malformed date text → the record (and the batch) fails
//! - source-only fields → counted per field, ignored
//!
//! Concrete transformers are thin: they declare the type pair and the enum
//! wrapping; everything else lives in `transform_batch`. The static field
//! tables make the per-type descriptor lookup a precomputed table walk, not a
//! runtime discovery.
//!
//! Mapping diagnostics come back as `MappingStats` rather than being logged
//! here; the orchestrator owns the log stream and the unmapped-field policy.
//! Transformers poll a shared `CancelFlag` between records so a failing peer
//! group can stop them early.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::EtlError;
use crate::records::field_value::CoercionError;
use crate::records::source_records::SourceFields;
use crate::records::target_records::MappedTarget;
use crate::records::{
    BondFutureQuoteSource, BondFutureQuoteTarget, SourceRecord, TargetRecord, XbondQuoteSource,
    XbondQuoteTarget, XbondTradeSource, XbondTradeTarget,
};

/// Cooperative cancellation flag shared across one transform fan-out.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals peers to abandon work at their next check.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What to do with source fields that have no same-name target counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmappedFieldPolicy {
    /// Ignore silently; surfaced at DEBUG only
    #[default]
    Drop,
    /// Surface at WARN
    Warn,
}

/// Per-batch mapping diagnostics, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingStats {
    /// Fields skipped because the source kind has no coercion to the target kind
    pub incompatible: BTreeMap<String, u64>,
    /// Source fields with no same-name target field
    pub source_only: BTreeMap<String, u64>,
}

impl MappingStats {
    fn record_incompatible(&mut self, field: &str) {
        *self.incompatible.entry(field.to_string()).or_insert(0) += 1;
    }

    fn record_source_only(&mut self, field: &str) {
        *self.source_only.entry(field.to_string()).or_insert(0) += 1;
    }
}

/// Output of one transformer over one type group.
#[derive(Debug, Clone)]
pub struct TransformBatch {
    pub records: Vec<TargetRecord>,
    pub stats: MappingStats,
}

/// Type-dispatched record transformer.
pub trait Transformer: Send + Sync {
    /// Source type this transformer accepts.
    fn source_type(&self) -> &'static str;

    /// Target type this transformer produces.
    fn target_type(&self) -> &'static str;

    /// Maps a group of source records 1:1 onto target records. All-or-nothing:
    /// the first failing record fails the batch.
    fn transform(&self, records: &[SourceRecord], cancel: &CancelFlag) -> Result<TransformBatch, EtlError>;
}

/// Maps one source record onto a fresh target, accumulating diagnostics.
pub fn map_record<S, T>(source: &S, stats: &mut MappingStats) -> Result<T, EtlError>
where
    S: SourceFields + ?Sized,
    T: MappedTarget,
{
    let mut target = T::default();
    for (name, value) in source.declared_fields() {
        let Some(descriptor) = T::field_table().iter().find(|d| d.name == name) else {
            stats.record_source_only(name);
            continue;
        };
        if value.is_null() {
            continue;
        }
        match (descriptor.assign)(&mut target, value) {
            Ok(()) => {}
            Err(CoercionError::Incompatible { .. }) => stats.record_incompatible(name),
            Err(CoercionError::MalformedDate(text)) => {
                return Err(EtlError::malformed_field(format!(
                    "field {} holds unparseable date '{}'",
                    name, text
                )));
            }
        }
    }
    Ok(target)
}

/// Shared batch loop used by every concrete transformer.
fn transform_batch<S, T, P, W>(
    type_name: &'static str,
    records: &[SourceRecord],
    cancel: &CancelFlag,
    project: P,
    wrap: W,
) -> Result<TransformBatch, EtlError>
where
    S: SourceFields,
    T: MappedTarget,
    P: Fn(&SourceRecord) -> Option<&S>,
    W: Fn(T) -> TargetRecord,
{
    let mut stats = MappingStats::default();
    let mut out = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(EtlError::cancelled(format!(
                "{} transform abandoned after {} records",
                type_name, index
            )));
        }
        let source = project(record).ok_or_else(|| {
            EtlError::transformation(
                type_name,
                index as u64,
                EtlError::internal_error(format!(
                    "record of type {} routed to the {} transformer",
                    record.type_name(),
                    type_name
                )),
            )
        })?;
        match map_record::<S, T>(source, &mut stats) {
            Ok(target) => out.push(wrap(target)),
            Err(cause) => return Err(EtlError::transformation(type_name, index as u64, cause)),
        }
    }
    Ok(TransformBatch { records: out, stats })
}

/// Xbond quote transformer.
#[derive(Debug, Default)]
pub struct XbondQuoteTransformer;

impl Transformer for XbondQuoteTransformer {
    fn source_type(&self) -> &'static str {
        "XbondQuote"
    }

    fn target_type(&self) -> &'static str {
        XbondQuoteTarget::TYPE_NAME
    }

    fn transform(&self, records: &[SourceRecord], cancel: &CancelFlag) -> Result<TransformBatch, EtlError> {
        transform_batch::<XbondQuoteSource, XbondQuoteTarget, _, _>(
            self.source_type(),
            records,
            cancel,
            |r| match r {
                SourceRecord::XbondQuote(s) => Some(s),
                _ => None,
            },
            TargetRecord::XbondQuote,
        )
    }
}

/// Xbond trade transformer.
#[derive(Debug, Default)]
pub struct XbondTradeTransformer;

impl Transformer for XbondTradeTransformer {
    fn source_type(&self) -> &'static str {
        "XbondTrade"
    }

    fn target_type(&self) -> &'static str {
        XbondTradeTarget::TYPE_NAME
    }

    fn transform(&self, records: &[SourceRecord], cancel: &CancelFlag) -> Result<TransformBatch, EtlError> {
        transform_batch::<XbondTradeSource, XbondTradeTarget, _, _>(
            self.source_type(),
            records,
            cancel,
            |r| match r {
                SourceRecord::XbondTrade(s) => Some(s),
                _ => None,
            },
            TargetRecord::XbondTrade,
        )
    }
}

/// Treasury-futures quote transformer.
#[derive(Debug, Default)]
pub struct BondFutureQuoteTransformer;

impl Transformer for BondFutureQuoteTransformer {
    fn source_type(&self) -> &'static str {
        "BondFutureQuote"
    }

    fn target_type(&self) -> &'static str {
        BondFutureQuoteTarget::TYPE_NAME
    }

    fn transform(&self, records: &[SourceRecord], cancel: &CancelFlag) -> Result<TransformBatch, EtlError> {
        transform_batch::<BondFutureQuoteSource, BondFutureQuoteTarget, _, _>(
            self.source_type(),
            records,
            cancel,
            |r| match r {
                SourceRecord::BondFutureQuote(s) => Some(s),
                _ => None,
            },
            TargetRecord::BondFutureQuote,
        )
    }
}

/// Source-type → transformer lookup.
pub struct TransformerRegistry {
    by_source: BTreeMap<&'static str, Arc<dyn Transformer>>,
}

impl TransformerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            by_source: BTreeMap::new(),
        }
    }

    /// Registry with the three standard market-data transformers.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(XbondQuoteTransformer));
        registry.register(Arc::new(XbondTradeTransformer));
        registry.register(Arc::new(BondFutureQuoteTransformer));
        registry
    }

    /// Registers a transformer under its source type. Last registration wins.
    pub fn register(&mut self, transformer: Arc<dyn Transformer>) {
        self.by_source.insert(transformer.source_type(), transformer);
    }

    /// Looks up the transformer for a source type.
    pub fn lookup(&self, source_type: &str) -> Option<Arc<dyn Transformer>> {
        self.by_source.get(source_type).cloned()
    }

    /// Registered source types, alphabetical.
    pub fn source_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_source.keys().copied()
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
