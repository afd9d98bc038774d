// Raw batch ingestion: file discovery rules, decoding, header mapping and currency parsing

pub mod columns;
pub mod ingest_meta;

pub use ingest_meta::{BatchReport, BatchStatus, IngestReport};

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::constants::STAGE_INGEST;
use crate::error::{PipelineError, Result};
use crate::observability::metrics::{emit_counter, emit_histogram, MetricName};
use crate::types::RawRecord;
use columns::{canonical_column, parse_currency, REQUIRED_COLUMNS};
pub use columns::ParsedAmount;

static LEADING_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)").expect("leading year pattern is valid"));

/// One raw disclosure file, read fully into memory.
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Records parsed from one batch plus the number of cells that fell back to zero.
#[derive(Debug, Clone)]
pub struct ParsedBatch {
    pub records: Vec<RawRecord>,
    pub malformed_values: usize,
}

#[derive(Debug, Clone)]
pub struct IngestOutput {
    pub records: Vec<RawRecord>,
    pub report: IngestReport,
}

/// Raw batch files are `*.csv` whose name starts with a digit.
pub fn is_batch_file_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_digit()) && name.to_ascii_lowercase().ends_with(".csv")
}

/// The leading integer of the file stem, e.g. `2019` for `2019-en.csv`.
pub fn year_from_file_name(name: &str) -> Option<i32> {
    let stem = name.split('.').next().unwrap_or(name);
    LEADING_YEAR
        .captures(stem)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// UTF-8 when valid, otherwise ISO-8859-1 (every byte maps to one code point).
pub fn decode_batch(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text.strip_prefix('\u{feff}').unwrap_or(text)),
        Err(_) => {
            debug!("Batch is not valid UTF-8, decoding as ISO-8859-1");
            Cow::Owned(bytes.iter().map(|b| *b as char).collect())
        }
    }
}

/// Parse one decoded batch. The year always comes from the file name; a
/// year column in the file is ignored.
pub fn parse_batch(name: &str, year: i32, text: &str) -> Result<ParsedBatch> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut index: HashMap<&'static str, usize> = HashMap::new();
    for (i, header) in reader.headers()?.iter().enumerate() {
        if let Some(column) = canonical_column(&header.trim().to_lowercase()) {
            index.entry(column).or_insert(i);
        }
    }
    if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !index.contains_key(*c)) {
        return Err(PipelineError::MissingField {
            source_name: name.to_string(),
            field: missing.to_string(),
        });
    }

    let mut records = Vec::new();
    let mut malformed_values = 0usize;
    for row in reader.records() {
        let row = row?;
        let text_field = |column: &str| -> String {
            index
                .get(column)
                .and_then(|i| row.get(*i))
                .unwrap_or("")
                .trim()
                .to_string()
        };
        let mut money_field = |column: &str| -> f64 {
            let raw = text_field(column);
            let amount = parse_currency(&raw);
            if amount.is_malformed() {
                malformed_values += 1;
                debug!("Malformed {} value '{}' in {}", column, raw, name);
            }
            amount.value()
        };

        let salary = money_field("salary");
        let benefits = money_field("benefits");
        records.push(RawRecord {
            year,
            sector: text_field("sector"),
            last_name: text_field("last_name"),
            first_name: text_field("first_name"),
            employer_raw: text_field("employer"),
            job_title_raw: text_field("job_title"),
            salary,
            benefits,
        });
    }

    Ok(ParsedBatch {
        records,
        malformed_values,
    })
}

/// Ingest batches in the given order. A batch that cannot be parsed is
/// rejected as a whole and does not affect its siblings.
pub fn ingest_batches(batches: Vec<RawBatch>) -> IngestOutput {
    let mut records = Vec::new();
    let mut report = IngestReport::default();

    for batch in batches {
        let year = year_from_file_name(&batch.name);
        let parsed = match year {
            Some(year) => parse_batch(&batch.name, year, &decode_batch(&batch.bytes)),
            None => Err(PipelineError::stage(
                STAGE_INGEST,
                format!("file name '{}' has no leading year", batch.name),
            )),
        };

        match parsed {
            Ok(parsed) => {
                info!(
                    "Accepted {} ({} rows, {} malformed values)",
                    batch.name,
                    parsed.records.len(),
                    parsed.malformed_values
                );
                emit_counter(MetricName::IngestBatchesAccepted, 1);
                emit_counter(MetricName::IngestRowsRead, parsed.records.len() as u64);
                emit_counter(MetricName::IngestMalformedValues, parsed.malformed_values as u64);
                emit_histogram(MetricName::IngestBatchRows, parsed.records.len() as f64);
                report.push(BatchReport {
                    file: batch.name,
                    year,
                    rows: parsed.records.len(),
                    malformed_values: parsed.malformed_values,
                    status: BatchStatus::Accepted,
                });
                records.extend(parsed.records);
            }
            Err(e) => {
                warn!("Rejected {}: {}", batch.name, e);
                emit_counter(MetricName::IngestBatchesRejected, 1);
                report.push(BatchReport {
                    file: batch.name,
                    year,
                    rows: 0,
                    malformed_values: 0,
                    status: BatchStatus::Rejected {
                        reason: e.to_string(),
                    },
                });
            }
        }
    }

    IngestOutput { records, report }
}
