//! Export the batch's stress-strain curves as one padded matrix.
//!
//! Layout (`;`-delimited, decimal comma, meant for spreadsheets):
//!
//! ```text
//! id_1;file_1;id_2;file_2;...
//! Strain;Stress;Strain;Stress;...
//! e_1[0];s_1[0];e_2[0];s_2[0];...
//! ...
//! ```
//!
//! Specimens shorter than the longest curve are padded with `0`.

use std::fs::File;
use std::path::Path;

use crate::domain::Specimen;
use crate::error::PipelineError;
use crate::io::raw::parse_decimal;

const DELIMITER: u8 = b';';
const STRAIN_LABEL: &str = "Strain";
const STRESS_LABEL: &str = "Stress";

/// The export as an in-memory matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMatrix {
    /// First header row: `(id, source file name)` per specimen.
    pub specimens: Vec<(String, String)>,
    /// Data rows, two columns per specimen, zero-padded.
    pub rows: Vec<Vec<f64>>,
}

/// Build the padded matrix for a batch.
pub fn export_matrix(specimens: &[&Specimen]) -> ExportMatrix {
    let n_rows = specimens
        .iter()
        .map(|s| s.strain.len().max(s.stress.len()))
        .max()
        .unwrap_or(0);

    let headers = specimens
        .iter()
        .map(|s| {
            let file = s
                .config
                .source_file
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            (s.id().to_string(), file)
        })
        .collect();

    let rows = (0..n_rows)
        .map(|i| {
            specimens
                .iter()
                .flat_map(|s| match (s.strain.get(i), s.stress.get(i)) {
                    (Some(&strain), Some(&stress)) => [strain, stress],
                    _ => [0.0, 0.0],
                })
                .collect()
        })
        .collect();

    ExportMatrix {
        specimens: headers,
        rows,
    }
}

/// Write the derived-data export CSV.
pub fn write_derived_export(path: &Path, specimens: &[&Specimen]) -> Result<(), PipelineError> {
    let matrix = export_matrix(specimens);
    let file = File::create(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .flexible(false)
        .from_writer(file);
    let export_err = |e: csv::Error| PipelineError::Export {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let ids = matrix
        .specimens
        .iter()
        .flat_map(|(id, file)| [id.clone(), file.clone()]);
    writer.write_record(ids).map_err(export_err)?;

    let labels = matrix.specimens.iter().flat_map(|_| [STRAIN_LABEL, STRESS_LABEL]);
    writer.write_record(labels).map_err(export_err)?;

    for (i, row) in matrix.rows.iter().enumerate() {
        let cells = row.iter().enumerate().map(|(c, &v)| {
            let specimen = specimens[c / 2];
            if i < specimen.len() { format_decimal(v) } else { "0".to_string() }
        });
        writer.write_record(cells).map_err(export_err)?;
    }

    writer.flush().map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Wrote {} specimens x {} rows to '{}'",
        matrix.specimens.len(),
        matrix.rows.len(),
        path.display()
    );
    Ok(())
}

/// Format with a decimal comma using the shortest round-trip representation.
pub fn format_decimal(v: f64) -> String {
    v.to_string().replace('.', ",")
}

/// One specimen's columns read back from an export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedCurve {
    pub id: String,
    pub source_file: String,
    /// Full (padded) columns.
    pub strain: Vec<f64>,
    pub stress: Vec<f64>,
}

impl ExportedCurve {
    /// Drop trailing `(0, 0)` padding pairs, always keeping the first sample.
    pub fn trimmed(&self) -> ExportedCurve {
        let mut n = self.strain.len();
        while n > 1 && self.strain[n - 1] == 0.0 && self.stress[n - 1] == 0.0 {
            n -= 1;
        }
        ExportedCurve {
            id: self.id.clone(),
            source_file: self.source_file.clone(),
            strain: self.strain[..n].to_vec(),
            stress: self.stress[..n].to_vec(),
        }
    }
}

/// Read a derived-data export back into per-specimen columns.
pub fn read_derived_export(path: &Path) -> Result<Vec<ExportedCurve>, PipelineError> {
    let file = File::open(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(DELIMITER)
        .flexible(true)
        .from_reader(file);

    let malformed = |line: usize, message: String| PipelineError::MalformedRecord {
        path: path.to_path_buf(),
        line,
        message,
    };

    let mut records = reader.records();
    let ids = match records.next() {
        Some(Ok(r)) => r,
        Some(Err(e)) => return Err(malformed(1, e.to_string())),
        None => return Ok(Vec::new()),
    };
    if ids.len() % 2 != 0 {
        return Err(malformed(1, format!("expected an even number of header cells, got {}", ids.len())));
    }
    match records.next() {
        Some(Ok(_)) => {}
        Some(Err(e)) => return Err(malformed(2, e.to_string())),
        None => return Err(malformed(2, "missing column label row".to_string())),
    }

    let mut curves: Vec<ExportedCurve> = ids
        .iter()
        .collect::<Vec<_>>()
        .chunks(2)
        .map(|pair| ExportedCurve {
            id: pair[0].to_string(),
            source_file: pair[1].to_string(),
            strain: Vec::new(),
            stress: Vec::new(),
        })
        .collect();

    for (idx, result) in records.enumerate() {
        let line = idx + 3;
        let record = result.map_err(|e| malformed(line, e.to_string()))?;
        if record.len() != curves.len() * 2 {
            return Err(malformed(
                line,
                format!("expected {} cells, got {}", curves.len() * 2, record.len()),
            ));
        }
        for (c, curve) in curves.iter_mut().enumerate() {
            let parse = |cell: &str| {
                parse_decimal(cell).ok_or_else(|| malformed(line, format!("invalid number '{cell}'")))
            };
            curve.strain.push(parse(&record[2 * c])?);
            curve.stress.push(parse(&record[2 * c + 1])?);
        }
    }

    Ok(curves)
}
