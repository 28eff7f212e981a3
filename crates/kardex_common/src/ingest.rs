//! Record ingestion from Kardex exports (CSV) and JSON dumps
//!
//! Column names are matched loosely: "WO No", "wo_no" and "WO-No" all land on
//! the work order id. Rows without a parseable open date are dropped and
//! counted in the `IngestReport`.

use crate::error::{KardexError, Result};
use crate::record::FaultRecord;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

const WORK_ORDER_COLUMNS: &[&str] = &["wo_no", "work_order_id", "work_order", "wo_number", "wo"];
const OPEN_DATE_COLUMNS: &[&str] = &["open_date", "opened", "date_opened", "date"];
const DONE_DATE_COLUMNS: &[&str] = &["done_date", "completion_date", "closed_date", "date_done"];
const VEHICLE_TYPE_COLUMNS: &[&str] = &["vehicle_type", "vehicle", "type"];
const COMPLAINT_COLUMNS: &[&str] = &["nature_of_complaint", "complaint"];
const DESCRIPTION_COLUMNS: &[&str] = &["job_description", "description", "job"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M"];

/// Outcome counts of one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub loaded: usize,
    /// Rows dropped for a missing or unparseable open date
    pub skipped: usize,
}

/// Load records from a `.csv` or `.json` file
pub fn load_records(path: &Path) -> Result<(Vec<FaultRecord>, IngestReport)> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let (records, report) = match extension.as_deref() {
        Some("csv") => read_csv(std::fs::File::open(path)?)?,
        Some("json") => read_json(&std::fs::read_to_string(path)?)?,
        _ => return Err(KardexError::UnsupportedFormat(path.to_path_buf())),
    };

    tracing::info!(
        "Loaded {} records from {} ({} skipped)",
        report.loaded,
        path.display(),
        report.skipped
    );
    Ok((records, report))
}

/// Parse a Kardex CSV export
pub fn read_csv<R: Read>(reader: R) -> Result<(Vec<FaultRecord>, IngestReport)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| (normalize_column(h), i))
        .collect();

    let index_of = |candidates: &[&str]| candidates.iter().find_map(|c| columns.get(*c).copied());
    let open_date_col = index_of(OPEN_DATE_COLUMNS)
        .ok_or_else(|| KardexError::Ingest("no 'Open Date' column in CSV header".to_string()))?;
    let layout = [
        index_of(WORK_ORDER_COLUMNS),
        Some(open_date_col),
        index_of(DONE_DATE_COLUMNS),
        index_of(VEHICLE_TYPE_COLUMNS),
        index_of(COMPLAINT_COLUMNS),
        index_of(DESCRIPTION_COLUMNS),
    ];

    let mut records = Vec::new();
    let mut report = IngestReport::default();

    for (line, row) in reader.records().enumerate() {
        let row = row?;
        if row.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let field = |col: Option<usize>| col.and_then(|i| row.get(i)).unwrap_or("");
        let raw = RawRow {
            work_order: field(layout[0]),
            open_date: field(layout[1]),
            done_date: field(layout[2]),
            vehicle_type: field(layout[3]),
            complaint: field(layout[4]),
            description: field(layout[5]),
        };
        match raw.to_record() {
            Some(record) => records.push(record),
            None => {
                // +2: header line and 1-based numbering
                tracing::debug!("Skipping CSV line {}: bad open date '{}'", line + 2, raw.open_date);
                report.skipped += 1;
            }
        }
    }

    report.loaded = records.len();
    Ok((records, report))
}

/// Parse a JSON array of record objects (or `{"records": [...]}`)
pub fn read_json(text: &str) -> Result<(Vec<FaultRecord>, IngestReport)> {
    let doc: Value = serde_json::from_str(text)?;
    let rows = match doc {
        Value::Array(rows) => rows,
        Value::Object(mut map) => match map.remove("records") {
            Some(Value::Array(rows)) => rows,
            _ => {
                return Err(KardexError::Ingest(
                    "expected a JSON array or an object with a 'records' array".to_string(),
                ))
            }
        },
        _ => {
            return Err(KardexError::Ingest(
                "expected a JSON array of records".to_string(),
            ))
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    let mut report = IngestReport::default();

    for (i, row) in rows.iter().enumerate() {
        let object = row
            .as_object()
            .ok_or_else(|| KardexError::Ingest(format!("record {} is not an object", i)))?;
        let fields: HashMap<String, String> = object
            .iter()
            .filter_map(|(k, v)| json_text(v).map(|text| (normalize_column(k), text)))
            .collect();
        let lookup = |candidates: &[&str]| {
            candidates
                .iter()
                .find_map(|c| fields.get(*c).map(String::as_str))
                .unwrap_or("")
        };
        let raw = RawRow {
            work_order: lookup(WORK_ORDER_COLUMNS),
            open_date: lookup(OPEN_DATE_COLUMNS),
            done_date: lookup(DONE_DATE_COLUMNS),
            vehicle_type: lookup(VEHICLE_TYPE_COLUMNS),
            complaint: lookup(COMPLAINT_COLUMNS),
            description: lookup(DESCRIPTION_COLUMNS),
        };
        match raw.to_record() {
            Some(record) => records.push(record),
            None => {
                tracing::debug!("Skipping JSON record {}: bad open date '{}'", i, raw.open_date);
                report.skipped += 1;
            }
        }
    }

    report.loaded = records.len();
    Ok((records, report))
}

/// Parse the date layouts seen in Kardex exports
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
                .map(|dt| dt.date())
        })
}

/// Collapse runs of whitespace (line breaks included) to single spaces
pub fn clean_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep only letters and digits: " WO-001 " becomes "WO001"
pub fn normalize_work_order(value: &str) -> String {
    let cleaned: String = value.chars().filter(|c| c.is_alphanumeric()).collect();
    if cleaned != value.trim() {
        tracing::trace!("Cleaned work order '{}' to '{}'", value, cleaned);
    }
    cleaned
}

struct RawRow<'a> {
    work_order: &'a str,
    open_date: &'a str,
    done_date: &'a str,
    vehicle_type: &'a str,
    complaint: &'a str,
    description: &'a str,
}

impl RawRow<'_> {
    fn to_record(&self) -> Option<FaultRecord> {
        let open_date = parse_date(self.open_date)?;
        let mut record = FaultRecord::new(
            &normalize_work_order(self.work_order),
            open_date,
            &clean_text(self.vehicle_type),
            &clean_text(self.complaint),
            &clean_text(self.description),
        );
        if let Some(done) = parse_date(self.done_date) {
            record = record.with_completion_date(done);
        }
        Some(record)
    }
}

fn normalize_column(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
