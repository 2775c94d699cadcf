//! Row-by-row streaming pipeline (spec §4.I): batches of
//! [`BATCH_SIZE`] rows, per-row encoding conversion, legacy date conversion,
//! foreign-key resolution, field mapping, and cylinder-size aggregation.
//! Grounded on `original_source/backend/app/migrations/
//! migrate_legacy_data.py`'s per-table batch loop (read legacy rows,
//! convert, validate, insert, checkpoint) and on `csv`'s `ByteRecord`
//! streaming so encoding conversion happens on raw bytes, not
//! already-decoded UTF-8.

use super::checkpoint::{self};
use super::dates::convert_legacy_date;
use super::encoding::EncodingConverter;
use super::report::ImportReport;
use crate::domain::ImportCheckpoint;
use crate::error::{CoreError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Read;
use std::time::Instant;

pub const BATCH_SIZE: usize = 5000;

/// Describes how spreadsheet columns map onto entity fields and which
/// fields need special handling (spec §4.I items 2-4).
#[derive(Debug, Clone, Default)]
pub struct FieldMapping {
    /// spreadsheet column header -> output field name
    pub column_map: HashMap<String, String>,
    /// output field name -> fk map key (see [`FkMaps`]), for columns that
    /// hold a legacy code needing resolution to an id
    pub fk_fields: HashMap<String, String>,
    /// output field names that hold a legacy-era date needing conversion
    pub date_fields: Vec<String>,
    /// spreadsheet columns that hold per-size cylinder quantities, e.g.
    /// "qty_50kg"; aggregated into `cylinder_totals` and `total_cylinders`
    pub cylinder_size_columns: Vec<String>,
}

/// code -> id maps, one per referenced entity, pre-loaded before a run
/// starts (spec §4.I item 3).
#[derive(Debug, Clone, Default)]
pub struct FkMaps(pub HashMap<String, HashMap<String, String>>);

impl FkMaps {
    pub fn resolve(&self, map_name: &str, code: &str) -> Option<String> {
        self.0.get(map_name).and_then(|m| m.get(code)).cloned()
    }
}

pub enum RowSkip {
    MissingReferent(String),
}

/// Converts one raw CSV record into a mapped output row, or signals that it
/// should be skipped because a foreign key referent is missing.
fn process_row(record: &csv::ByteRecord, headers: &csv::StringRecord, mapping: &FieldMapping, fk_maps: &FkMaps, encoding: &EncodingConverter) -> std::result::Result<Value, RowSkip> {
    let mut out = Map::new();
    let mut cylinder_totals: HashMap<String, i64> = HashMap::new();

    for (i, header) in headers.iter().enumerate() {
        let Some(raw) = record.get(i) else { continue };
        let text = encoding.convert(raw);

        if mapping.cylinder_size_columns.iter().any(|c| c == header) {
            let qty: i64 = text.trim().parse().unwrap_or(0);
            cylinder_totals.insert(header.to_string(), qty);
            continue;
        }

        let Some(field_name) = mapping.column_map.get(header) else { continue };

        if mapping.date_fields.contains(field_name) {
            match convert_legacy_date(text.trim()) {
                Ok(date) => {
                    out.insert(field_name.clone(), Value::String(date.to_string()));
                }
                Err(_) => {
                    out.insert(field_name.clone(), Value::Null);
                }
            }
            continue;
        }

        if let Some(map_name) = mapping.fk_fields.get(field_name) {
            let code = text.trim().to_string();
            match fk_maps.resolve(map_name, &code) {
                Some(id) => {
                    out.insert(field_name.clone(), Value::String(id));
                }
                None => return Err(RowSkip::MissingReferent(code)),
            }
            continue;
        }

        out.insert(field_name.clone(), Value::String(text));
    }

    if !cylinder_totals.is_empty() {
        let total: i64 = cylinder_totals.values().sum();
        out.insert("cylinder_totals".to_string(), serde_json::to_value(&cylinder_totals).unwrap_or(Value::Null));
        out.insert("total_cylinders".to_string(), Value::from(total));
    }

    Ok(Value::Object(out))
}

/// Streams `reader`'s rows in batches of [`BATCH_SIZE`], writing a
/// checkpoint after every batch and resuming from an existing sidecar if
/// one is present. In `dry_run` mode no rows are returned for writing;
/// callers get only the report.
pub async fn run<R: Read>(reader: R, source_file: &str, mapping: &FieldMapping, fk_maps: &FkMaps, dry_run: bool) -> Result<(ImportReport, Vec<Value>)> {
    let started = Instant::now();
    let mut report = ImportReport::new(dry_run);
    let encoding = EncodingConverter::big5();
    let mut mapped_rows = Vec::new();

    let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = csv_reader.headers().map_err(CoreError::from)?.clone();

    let mut checkpoint = checkpoint::load(source_file)?.unwrap_or_else(|| ImportCheckpoint::new(source_file.to_string()));
    let resume_from = checkpoint.last_processed_row;

    let mut row_index: u64 = 0;
    let mut batch_count: u64 = 0;

    let mut records_iter = csv_reader.byte_records();
    while let Some(record) = records_iter.next() {
        row_index += 1;
        if row_index <= resume_from {
            continue;
        }
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                report.record_failure(e.to_string());
                continue;
            }
        };

        match process_row(&record, &headers, mapping, fk_maps, &encoding) {
            Ok(row) => {
                report.record_success();
                if !dry_run {
                    mapped_rows.push(row);
                }
            }
            Err(RowSkip::MissingReferent(code)) => {
                report.record_skip(code);
            }
        }

        if row_index % BATCH_SIZE as u64 == 0 {
            batch_count += 1;
            checkpoint.last_processed_row = row_index;
            checkpoint.batches_completed = batch_count;
            checkpoint.errors = report.errors.clone();
            checkpoint::save(&checkpoint)?;
        }
    }

    checkpoint.last_processed_row = row_index;
    checkpoint.batches_completed = batch_count + 1;
    checkpoint.errors = report.errors.clone();
    checkpoint::clear(source_file)?;

    report.set_elapsed(started.elapsed());
    Ok((report, mapped_rows))
}
