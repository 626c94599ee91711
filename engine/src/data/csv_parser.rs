// Parses delimited files into time-indexed, column-oriented tables.
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, Trim};

use super::timestamp::{find_time_column, normalize_column};
use crate::error::EngineError;

/// A parsed source file: rows sorted by time, one numeric column per header.
///
/// Rows whose timestamp could not be parsed are dropped while building the
/// table. Cells that are blank or non-numeric are kept as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    columns: Vec<String>,
    time_column: usize,
    timestamps: Vec<NaiveDateTime>,
    values: Vec<Vec<Option<f64>>>,
}

fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(true).flexible(true).trim(Trim::Headers);
    builder
}

/// Reads only the header row, with surrounding whitespace removed from each name.
pub fn read_headers<R: Read>(reader: R) -> Result<Vec<String>, EngineError> {
    let mut rdr = reader_builder().from_reader(reader);
    Ok(rdr.headers()?.iter().map(str::to_string).collect())
}

pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl TimeSeriesTable {
    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, EngineError> {
        let mut rdr = reader_builder().from_reader(reader);
        let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let time_column = find_time_column(&columns)
            .filter(|_| columns.iter().any(|c| !c.is_empty()))
            .ok_or_else(|| EngineError::CsvDataFormatError("missing header row".to_string()))?;

        let mut raw_times = Vec::new();
        let mut raw_values: Vec<Vec<Option<f64>>> = vec![Vec::new(); columns.len()];
        for (idx, result) in rdr.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                // The underlying stream broke (truncated file, bad archive checksum):
                // the rest of the source cannot be trusted.
                Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
                Err(e) => {
                    tracing::debug!(line = idx + 2, error = %e, "Skipping unreadable CSV record");
                    continue;
                }
            };
            raw_times.push(record.get(time_column).unwrap_or("").to_string());
            for (col, values) in raw_values.iter_mut().enumerate() {
                values.push(record.get(col).and_then(parse_number));
            }
        }

        let parsed = normalize_column(&raw_times);
        let mut order: Vec<(usize, NaiveDateTime)> = parsed
            .into_iter()
            .enumerate()
            .filter_map(|(row, ts)| ts.map(|ts| (row, ts)))
            .collect();
        let dropped = raw_times.len() - order.len();
        if dropped > 0 {
            tracing::debug!(dropped, column = %columns[time_column], "Dropped rows with unparseable timestamps");
        }
        // Stable, so rows sharing a timestamp keep their file order.
        order.sort_by_key(|(_, ts)| *ts);

        let timestamps = order.iter().map(|(_, ts)| *ts).collect();
        let values = raw_values
            .into_iter()
            .map(|column| order.iter().map(|(row, _)| column[*row]).collect())
            .collect();

        Ok(TimeSeriesTable { columns, time_column, timestamps, values })
    }

    pub fn time_column(&self) -> &str {
        &self.columns[self.time_column]
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Values of `name` aligned with [`timestamps`](Self::timestamps), or `None` if the column is absent.
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|idx| self.values[idx].as_slice())
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}
