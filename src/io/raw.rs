//! Raw measurement file reader.
//!
//! Layout: a fixed number of header/metadata lines (skipped unconditionally), then
//! one whitespace-separated row per measurement sample. Column 1 is force and
//! column 2 is crosshead displacement (0-indexed); both use a decimal comma.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::PipelineError;

/// Paired force/displacement samples of one specimen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSeries {
    pub force: Vec<f64>,
    pub displacement: Vec<f64>,
}

impl RawSeries {
    pub fn len(&self) -> usize {
        self.force.len()
    }

    pub fn is_empty(&self) -> bool {
        self.force.is_empty()
    }
}

const FORCE_COLUMN: usize = 1;
const DISPLACEMENT_COLUMN: usize = 2;

/// Read a raw measurement file.
pub fn read_raw_series(path: &Path, header_lines: usize) -> Result<RawSeries, PipelineError> {
    let file = File::open(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_raw_series_from(BufReader::new(file), path, header_lines)
}

/// Read raw samples from any buffered reader; `path` is only used for diagnostics.
pub fn read_raw_series_from<R: BufRead>(
    mut reader: R,
    path: &Path,
    header_lines: usize,
) -> Result<RawSeries, PipelineError> {
    let mut series = RawSeries::default();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if read == 0 {
            break;
        }
        line_no += 1;
        // Header lines are skipped undecoded (may be Latin-1).
        if line_no <= header_lines {
            continue;
        }

        let line = std::str::from_utf8(&buf)
            .map_err(|e| malformed(path, line_no, format!("data line is not valid UTF-8: {e}")))?;
        if line.trim().is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() <= DISPLACEMENT_COLUMN {
            return Err(malformed(
                path,
                line_no,
                format!("expected at least 3 columns, found {}", tokens.len()),
            ));
        }

        let force = parse_decimal(tokens[FORCE_COLUMN])
            .ok_or_else(|| malformed(path, line_no, format!("invalid force '{}'", tokens[FORCE_COLUMN])))?;
        let displacement = parse_decimal(tokens[DISPLACEMENT_COLUMN]).ok_or_else(|| {
            malformed(
                path,
                line_no,
                format!("invalid displacement '{}'", tokens[DISPLACEMENT_COLUMN]),
            )
        })?;

        series.force.push(force);
        series.displacement.push(displacement);
    }

    if series.is_empty() {
        return Err(malformed(
            path,
            header_lines,
            "no data lines after the header".to_string(),
        ));
    }

    Ok(series)
}

/// Parse a decimal-comma number (`"12,5"` → `12.5`). Non-finite values are rejected.
pub fn parse_decimal(s: &str) -> Option<f64> {
    let v = s.trim().replace(',', ".").parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

fn malformed(path: &Path, line: usize, message: String) -> PipelineError {
    PipelineError::MalformedRecord {
        path: path.to_path_buf(),
        line,
        message,
    }
}
