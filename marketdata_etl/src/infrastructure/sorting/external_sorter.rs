// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # External Sorter
//!
//! Stable sort of target records by the configured field list, bounded by the
//! sort memory budget.
//!
//! - **In-memory path**: when the estimated footprint fits the budget, the
//!   whole list sorts in RAM.
//! - **External path**: otherwise the input is cut into budget-sized runs;
//!   each run sorts in RAM and spills to a temp file as length-prefixed
//!   bincode frames, then a k-way heap merge drains the runs in key order.
//!   Runs are consecutive input slices and the merge breaks ties by
//!   (run, position), so ties preserve input order end to end.
//!
//! Footprint estimation is `records × record.bytes.estimate` (500 bytes per
//! record unless overridden in the loader block). Spill files live in a
//! `tempfile` directory whose guard removes them on every exit path.
//! Switching to the external path is logged at WARN; it is not a failure.

use byte_unit::{Byte, UnitType};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

use marketdata_etl_domain::records::field_value::{cmp_sort_keys, FieldValue};
use marketdata_etl_domain::{EtlError, SortMemoryLimit, TargetRecord};

/// Memory-bounded stable sorter.
#[derive(Debug, Clone)]
pub struct ExternalSorter {
    sort_fields: Vec<String>,
    memory_limit: SortMemoryLimit,
    record_bytes_estimate: u64,
}

impl ExternalSorter {
    pub fn new(sort_fields: Vec<String>, memory_limit: SortMemoryLimit, record_bytes_estimate: u64) -> Self {
        Self {
            sort_fields,
            memory_limit,
            record_bytes_estimate,
        }
    }

    /// Sorts the records, choosing the in-memory or external path by
    /// estimated footprint. Callers must have dropped null-key records
    /// already; an unknown sort field is a configuration error.
    pub fn sort(&self, records: Vec<TargetRecord>) -> Result<Vec<TargetRecord>, EtlError> {
        if records.len() <= 1 {
            return Ok(records);
        }

        let estimated = records.len() as u64 * self.record_bytes_estimate;
        if estimated <= self.memory_limit.bytes() {
            debug!(
                records = records.len(),
                estimated = %format_bytes(estimated),
                "sorting in memory"
            );
            self.sort_in_memory(records)
        } else {
            warn!(
                "Data size {} exceeds memory limit {}. Switching to external sort",
                format_bytes(estimated),
                format_bytes(self.memory_limit.bytes())
            );
            self.sort_external(records)
        }
    }

    fn key_of(&self, record: &TargetRecord) -> Result<Vec<FieldValue>, EtlError> {
        self.sort_fields
            .iter()
            .map(|field| {
                record.sort_value(field).ok_or_else(|| {
                    EtlError::invalid_config(format!(
                        "sort field '{}' is not declared by target type {}",
                        field,
                        record.type_name()
                    ))
                })
            })
            .collect()
    }

    fn sort_in_memory(&self, records: Vec<TargetRecord>) -> Result<Vec<TargetRecord>, EtlError> {
        let mut keyed = records
            .into_iter()
            .map(|record| self.key_of(&record).map(|key| (key, record)))
            .collect::<Result<Vec<_>, _>>()?;
        // Vec::sort_by is stable; ties keep input order
        keyed.sort_by(|a, b| cmp_sort_keys(&a.0, &b.0));
        Ok(keyed.into_iter().map(|(_, record)| record).collect())
    }

    fn sort_external(&self, records: Vec<TargetRecord>) -> Result<Vec<TargetRecord>, EtlError> {
        let chunk_capacity = usize::try_from(self.memory_limit.bytes() / self.record_bytes_estimate)
            .unwrap_or(usize::MAX)
            .max(1);
        let total = records.len();
        let spill_dir = tempfile::tempdir().map_err(|e| {
            EtlError::io_error(format!("cannot create sort spill directory: {}", e))
        })?;

        // Sort and spill budget-sized runs
        let mut run_paths = Vec::new();
        let mut input = records.into_iter().peekable();
        let mut run_index = 0usize;
        while input.peek().is_some() {
            let chunk: Vec<TargetRecord> = input.by_ref().take(chunk_capacity).collect();
            let sorted = self.sort_in_memory(chunk)?;
            let path = spill_dir.path().join(format!("run_{:05}.bin", run_index));
            write_run(&path, &sorted)?;
            run_paths.push(path);
            run_index += 1;
        }
        debug!(runs = run_paths.len(), chunk_capacity, "external sort spilled runs");

        // K-way merge by minimum head
        let mut readers = run_paths
            .iter()
            .map(|path| RunReader::open(path))
            .collect::<Result<Vec<_>, _>>()?;
        let mut heap = BinaryHeap::with_capacity(readers.len());
        for (run, reader) in readers.iter_mut().enumerate() {
            if let Some(record) = reader.next_record()? {
                heap.push(MergeEntry {
                    key: self.key_of(&record)?,
                    run,
                    seq: 0,
                    record,
                });
            }
        }

        let mut output = Vec::with_capacity(total);
        while let Some(entry) = heap.pop() {
            let MergeEntry { run, seq, record, .. } = entry;
            output.push(record);
            if let Some(next) = readers[run].next_record()? {
                heap.push(MergeEntry {
                    key: self.key_of(&next)?,
                    run,
                    seq: seq + 1,
                    record: next,
                });
            }
        }
        // spill_dir guard removes the run files here, success or not
        Ok(output)
    }
}

/// Heap entry; the `BinaryHeap` is a max-heap, so the ordering is reversed to
/// pop the minimum head. Ties order by (run, seq), which is input order.
struct MergeEntry {
    key: Vec<FieldValue>,
    run: usize,
    seq: u64,
    record: TargetRecord,
}

impl MergeEntry {
    fn ascending_cmp(&self, other: &Self) -> Ordering {
        cmp_sort_keys(&self.key, &other.key)
            .then_with(|| self.run.cmp(&other.run))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialEq for MergeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.ascending_cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeEntry {}

impl PartialOrd for MergeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ascending_cmp(other).reverse()
    }
}

fn write_run(path: &Path, records: &[TargetRecord]) -> Result<(), EtlError> {
    let file = File::create(path).map_err(|e| EtlError::io_error(format!("{}: {}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        let frame = bincode::serialize(record)
            .map_err(|e| EtlError::SerializationError(format!("spill frame: {}", e)))?;
        let len = u32::try_from(frame.len())
            .map_err(|_| EtlError::internal_error("spill frame exceeds u32 length"))?;
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(&frame)?;
    }
    writer.flush()?;
    Ok(())
}

/// Sequential reader over one spilled run.
struct RunReader {
    reader: BufReader<File>,
}

impl RunReader {
    fn open(path: &Path) -> Result<Self, EtlError> {
        let file = File::open(path).map_err(|e| EtlError::io_error(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            reader: BufReader::new(file),
        })
    }

    fn next_record(&mut self) -> Result<Option<TargetRecord>, EtlError> {
        let mut len_bytes = [0u8; 4];
        match self.reader.read_exact(&mut len_bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let mut frame = vec![0u8; u32::from_le_bytes(len_bytes) as usize];
        self.reader.read_exact(&mut frame)?;
        let record = bincode::deserialize(&frame)
            .map_err(|e| EtlError::SerializationError(format!("spill frame: {}", e)))?;
        Ok(Some(record))
    }
}

fn format_bytes(bytes: u64) -> String {
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Decimal);
    format!("{:.2}", adjusted)
}
