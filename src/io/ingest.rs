//! Batch configuration ingest and specimen building.
//!
//! This module turns the batch configuration file plus one raw measurement file per
//! row into fully populated `Specimen`s.
//!
//! Design goals:
//! - **Strict schema**: fixed field order, clear errors with line numbers
//! - **Row-level collection**: bad rows are collected, the caller applies the
//!   failure policy
//! - **No I/O for excluded rows**: valid-only filtering happens before any raw
//!   file is opened
//! - **Separation of concerns**: no property or fitting logic here

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::domain::{ImportSettings, Specimen, SpecimenConfig};
use crate::error::PipelineError;
use crate::io::raw::{RawSeries, parse_decimal, read_raw_series};

/// Field positions of a batch configuration row.
const FIELD_ID: usize = 0;
const FIELD_WIDTH: usize = 1;
const FIELD_THICKNESS: usize = 2;
const FIELD_LENGTH: usize = 3;
const FIELD_FORCE_OFFSET: usize = 4;
const FIELD_VALIDITY: usize = 5;
const FIELD_COLOR: usize = 6;
const FIELD_SOURCE_FILE: usize = 7;

/// Parsed batch configuration.
#[derive(Debug)]
pub struct BatchConfig {
    /// Rows to process, in file order.
    pub specimens: Vec<SpecimenConfig>,
    /// Rows that could not be parsed.
    pub row_errors: Vec<PipelineError>,
    pub rows_read: usize,
    /// Rows dropped by valid-only filtering.
    pub excluded_invalid: usize,
}

/// Load the batch configuration file.
///
/// Source file references are resolved against the configuration file's directory.
pub fn load_batch_config(
    path: &Path,
    settings: &ImportSettings,
    valid_only: bool,
) -> Result<BatchConfig, PipelineError> {
    let file = File::open(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(settings.delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let markers: Vec<String> = settings
        .invalid_markers
        .iter()
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .collect();

    let mut specimens = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    let mut excluded_invalid = 0usize;

    for (idx, result) in reader.byte_records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line() as usize).unwrap_or(idx + 1);
                if line <= settings.config_header_lines {
                    continue;
                }
                row_errors.push(PipelineError::Config {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        // Header lines are counted physically; the csv reader drops blank lines.
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 1);
        if line <= settings.config_header_lines {
            continue;
        }
        // Non-UTF-8 cells (Latin-1 exports) are decoded lossily.
        let record = StringRecord::from_byte_record_lossy(record);

        if record.iter().all(str::is_empty) {
            continue;
        }
        rows_read += 1;

        match parse_row(&record, line, &base_dir, &markers) {
            Ok(config) if valid_only && !config.is_valid => {
                log::debug!("Excluding invalid specimen '{}' (line {line})", config.id);
                excluded_invalid += 1;
            }
            Ok(config) => specimens.push(config),
            Err(e) => row_errors.push(e),
        }
    }

    Ok(BatchConfig {
        specimens,
        row_errors,
        rows_read,
        excluded_invalid,
    })
}

fn parse_row(
    record: &StringRecord,
    line: usize,
    base_dir: &Path,
    invalid_markers: &[String],
) -> Result<SpecimenConfig, PipelineError> {
    let id = get_required(record, FIELD_ID, "id", line, None)?.to_string();
    let config_err = |message: String| PipelineError::Config {
        line,
        id: Some(id.clone()),
        message,
    };

    let number = |field: usize, name: &str| -> Result<f64, PipelineError> {
        let raw = get_required(record, field, name, line, Some(&id))?;
        parse_decimal(raw).ok_or_else(|| config_err(format!("invalid `{name}` value '{raw}'")))
    };

    let width = number(FIELD_WIDTH, "width")?;
    let thickness = number(FIELD_THICKNESS, "thickness")?;
    let length = number(FIELD_LENGTH, "length")?;
    let force_offset = number(FIELD_FORCE_OFFSET, "force_offset")?;

    let validity = record.get(FIELD_VALIDITY).unwrap_or("").to_lowercase();
    let is_valid = !invalid_markers.iter().any(|m| validity.contains(m.as_str()));

    let color = record
        .get(FIELD_COLOR)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let source = get_required(record, FIELD_SOURCE_FILE, "source_file", line, Some(&id))?;
    let source_file = resolve_source(base_dir, source);

    Ok(SpecimenConfig {
        id,
        width,
        thickness,
        length,
        force_offset,
        is_valid,
        color,
        source_file,
        line,
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    field: usize,
    name: &str,
    line: usize,
    id: Option<&str>,
) -> Result<&'a str, PipelineError> {
    record
        .get(field)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PipelineError::Config {
            line,
            id: id.map(str::to_string),
            message: format!("missing required field `{name}` (column {})", field + 1),
        })
}

fn resolve_source(base_dir: &Path, source: &str) -> PathBuf {
    // Configuration files written on Windows use backslash separators.
    let normalized: PathBuf = source.split(['\\', '/']).collect();
    if normalized.is_absolute() {
        normalized
    } else {
        base_dir.join(normalized)
    }
}

/// Reject geometry that would divide by zero or flip signs in the conversion.
pub fn validate_geometry(config: &SpecimenConfig) -> Result<(), PipelineError> {
    let checks = [
        ("width", config.width),
        ("thickness", config.thickness),
        ("length", config.length),
    ];
    for (name, value) in checks {
        if !(value.is_finite() && value > 0.0) {
            return Err(PipelineError::Config {
                line: config.line,
                id: Some(config.id.clone()),
                message: format!("`{name}` must be finite and > 0, got {value}"),
            });
        }
    }
    if !config.force_offset.is_finite() {
        return Err(PipelineError::Config {
            line: config.line,
            id: Some(config.id.clone()),
            message: "`force_offset` must be finite".to_string(),
        });
    }
    Ok(())
}

/// Build a specimen: validate geometry, read its raw file and convert to strain/stress.
pub fn build_specimen(config: &SpecimenConfig, settings: &ImportSettings) -> Result<Specimen, PipelineError> {
    validate_geometry(config)?;
    let raw = read_raw_series(&config.source_file, settings.raw_header_lines)?;
    specimen_from_raw(config, &raw)
}

/// Convert a raw series to engineering strain (percent) and stress.
///
/// The first sample's displacement is the zero-strain reference.
pub fn specimen_from_raw(config: &SpecimenConfig, raw: &RawSeries) -> Result<Specimen, PipelineError> {
    validate_geometry(config)?;
    let Some(&dispo0) = raw.displacement.first() else {
        return Err(PipelineError::DegenerateCurve {
            id: config.id.clone(),
            message: "raw series has no samples".to_string(),
        });
    };

    let gauge = 1000.0 * config.length;
    let area = config.area();

    let strain: Vec<f64> = raw
        .displacement
        .iter()
        .map(|&d| ((d - dispo0) / gauge) * 100.0)
        .collect();
    let stress: Vec<f64> = raw
        .force
        .iter()
        .map(|&f| (f - config.force_offset) / area)
        .collect();

    if strain.iter().chain(&stress).any(|v| !v.is_finite()) {
        return Err(PipelineError::DegenerateCurve {
            id: config.id.clone(),
            message: "non-finite strain/stress after conversion".to_string(),
        });
    }

    log::debug!(
        "Built specimen '{}' from '{}': {} samples",
        config.id,
        config.source_file.display(),
        strain.len()
    );

    Ok(Specimen {
        config: config.clone(),
        strain,
        stress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(width: f64, thickness: f64, length: f64) -> SpecimenConfig {
        SpecimenConfig {
            id: "1".to_string(),
            width,
            thickness,
            length,
            force_offset: 0.0,
            is_valid: true,
            color: None,
            source_file: PathBuf::from("1.txt"),
            line: 3,
        }
    }

    #[test]
    fn converts_reference_scenario() {
        let raw = RawSeries {
            force: vec![0.0, 100.0, 200.0, 150.0],
            displacement: vec![0.0, 50.0, 250.0, 300.0],
        };
        let specimen = specimen_from_raw(&config(10.0, 2.0, 50.0), &raw).unwrap();

        let expected_strain = [0.0, 0.1, 0.5, 0.6];
        let expected_stress = [0.0, 5.0, 10.0, 7.5];
        for i in 0..4 {
            assert!((specimen.strain[i] - expected_strain[i]).abs() < 1e-12);
            assert!((specimen.stress[i] - expected_stress[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn first_sample_is_zero_strain_reference() {
        let raw = RawSeries {
            force: vec![10.0, 20.0],
            displacement: vec![12.0, 62.0],
        };
        let mut cfg = config(1.0, 1.0, 50.0);
        cfg.force_offset = 10.0;
        let specimen = specimen_from_raw(&cfg, &raw).unwrap();
        assert_eq!(specimen.strain[0], 0.0);
        assert_eq!(specimen.stress[0], 0.0);
        assert!((specimen.strain[1] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn non_positive_geometry_is_config_error() {
        let raw = RawSeries {
            force: vec![0.0],
            displacement: vec![0.0],
        };
        for cfg in [config(0.0, 2.0, 50.0), config(10.0, -2.0, 50.0), config(10.0, 2.0, 0.0)] {
            let err = specimen_from_raw(&cfg, &raw).unwrap_err();
            assert!(matches!(err, PipelineError::Config { .. }), "{err}");
        }
    }

    #[test]
    fn geometry_is_checked_before_file_io() {
        // The source file does not exist; geometry must fail first.
        let err = build_specimen(&config(10.0, 0.0, 50.0), &ImportSettings::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }), "{err}");
    }

    #[test]
    fn loads_config_rows_and_flags_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.csv");
        std::fs::write(
            &path,
            "Batch 7;;;;;;;\nNr;b;h;l;F0;gueltig;Farbe;Datei\n\
             1;10,0;2,0;50;0,5;ja;red;s1.txt\n\
             2;10;2;50;0;NEIN (Riss);;sub\\s2.txt\n\
             \n\
             3;10;2;50;0;;blue;s3.txt\n",
        )
        .unwrap();

        let batch = load_batch_config(&path, &ImportSettings::default(), false).unwrap();
        assert!(batch.row_errors.is_empty(), "{:?}", batch.row_errors);
        assert_eq!(batch.rows_read, 3);
        assert_eq!(batch.specimens.len(), 3);

        let first = &batch.specimens[0];
        assert_eq!(first.id, "1");
        assert_eq!(first.width, 10.0);
        assert_eq!(first.force_offset, 0.5);
        assert!(first.is_valid);
        assert_eq!(first.color.as_deref(), Some("red"));
        assert_eq!(first.source_file, dir.path().join("s1.txt"));

        let second = &batch.specimens[1];
        assert!(!second.is_valid);
        assert_eq!(second.color, None);
        assert_eq!(second.source_file, dir.path().join("sub").join("s2.txt"));

        assert!(batch.specimens[2].is_valid);
    }

    #[test]
    fn default_marker_does_not_flag_ordinary_words() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.csv");
        std::fs::write(
            &path,
            "h\nh\n1;10;2;50;0;nominal;;a.txt\n2;10;2;50;0;not tested;;b.txt\n3;10;2;50;0;Nein;;c.txt\n",
        )
        .unwrap();

        let batch = load_batch_config(&path, &ImportSettings::default(), false).unwrap();
        let valid: Vec<bool> = batch.specimens.iter().map(|s| s.is_valid).collect();
        assert_eq!(valid, [true, true, false]);
    }

    #[test]
    fn blank_header_line_counts_toward_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.csv");
        std::fs::write(
            &path,
            "Serie 1\n\n1;10;2;50;0;ja;;a.txt\n2;10;2;50;0;ja;;b.txt\n",
        )
        .unwrap();

        let batch = load_batch_config(&path, &ImportSettings::default(), false).unwrap();
        let ids: Vec<&str> = batch.specimens.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
        assert_eq!(batch.specimens[0].line, 3);
    }

    #[test]
    fn latin1_cells_are_decoded_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.csv");
        let mut bytes = b"Pr\xfcfserie\nNr;b;h;l;F0;g\xfcltig;Farbe;Datei\n".to_vec();
        bytes.extend_from_slice(b"1;10;2;50;0;ja;gr\xfcn;a.txt\n2;10;2;50;0;NEIN;;b.txt\n");
        std::fs::write(&path, bytes).unwrap();

        let batch = load_batch_config(&path, &ImportSettings::default(), false).unwrap();
        assert!(batch.row_errors.is_empty(), "{:?}", batch.row_errors);
        assert_eq!(batch.specimens.len(), 2);
        assert_eq!(batch.specimens[0].color.as_deref(), Some("gr\u{fffd}n"));
        assert!(!batch.specimens[1].is_valid);
    }

    #[test]
    fn valid_only_drops_rows_without_reading_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.csv");
        std::fs::write(
            &path,
            "h\nh\n1;10;2;50;0;ja;;missing1.txt\n2;10;2;50;0;nein;;missing2.txt\n",
        )
        .unwrap();

        let batch = load_batch_config(&path, &ImportSettings::default(), true).unwrap();
        assert_eq!(batch.specimens.len(), 1);
        assert_eq!(batch.excluded_invalid, 1);
        assert_eq!(batch.specimens[0].id, "1");
    }

    #[test]
    fn bad_numeric_field_is_collected_as_row_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.csv");
        std::fs::write(&path, "h\nh\n1;ten;2;50;0;ja;;a.txt\n2;10;2;50;0;ja;;b.txt\n3;10;2\n").unwrap();

        let batch = load_batch_config(&path, &ImportSettings::default(), false).unwrap();
        assert_eq!(batch.specimens.len(), 1);
        assert_eq!(batch.row_errors.len(), 2);
        match &batch.row_errors[0] {
            PipelineError::Config { line, id, message } => {
                assert_eq!(*line, 3);
                assert_eq!(id.as_deref(), Some("1"));
                assert!(message.contains("width"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
