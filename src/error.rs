//! Error types.
//!
//! - `PipelineError` is the typed error returned by the library modules.
//! - `AppError` is the binary-facing error: a message plus a process exit code.

use std::path::PathBuf;

/// Errors produced while importing, analyzing or fitting specimens.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Bad geometry or a malformed batch configuration row.
    #[error("Config error (line {line}{}): {message}", fmt_id(.id))]
    Config {
        line: usize,
        id: Option<String>,
        message: String,
    },

    /// Unparsable line in a raw measurement file.
    #[error("Malformed record in '{}' (line {line}): {message}", .path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid analysis settings file.
    #[error("Invalid settings '{}': {message}", .path.display())]
    Settings { path: PathBuf, message: String },

    /// Zero-division in a slope calculation.
    #[error("Degenerate curve for specimen '{id}': {message}")]
    DegenerateCurve { id: String, message: String },

    #[error("Insufficient samples for {context}: need at least {needed}, got {got}")]
    InsufficientSamples {
        context: String,
        needed: usize,
        got: usize,
    },

    #[error("Curve fit did not converge for specimen '{id}': {message}")]
    FitDidNotConverge { id: String, message: String },

    /// Relative error is undefined because every observed stress is zero.
    #[error("Division by zero for specimen '{id}': {message}")]
    DivisionByZero { id: String, message: String },

    /// A per-specimen failure tagged with the offending specimen id.
    #[error("Specimen '{id}': {source}")]
    Specimen {
        id: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Export error on '{}': {message}", .path.display())]
    Export { path: PathBuf, message: String },

    /// `--specimen` matched neither a batch position nor an id.
    #[error("No specimen '{selector}' in the batch ({available} available)")]
    UnknownSpecimen { selector: String, available: usize },
}

fn fmt_id(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(", specimen '{id}'"),
        None => String::new(),
    }
}

impl PipelineError {
    /// Wrap this error with the specimen id it belongs to.
    pub fn for_specimen(self, id: impl Into<String>) -> Self {
        match self {
            already @ PipelineError::Specimen { .. } => already,
            other => PipelineError::Specimen {
                id: id.into(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error (unwraps `Specimen` tags).
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Specimen { source, .. } => source.root(),
            other => other,
        }
    }

    /// Process exit code used by the binary for this error.
    pub fn exit_code(&self) -> u8 {
        match self.root() {
            PipelineError::Config { .. }
            | PipelineError::MalformedRecord { .. }
            | PipelineError::Io { .. }
            | PipelineError::Settings { .. }
            | PipelineError::Export { .. }
            | PipelineError::UnknownSpecimen { .. } => 2,
            PipelineError::DegenerateCurve { .. } | PipelineError::InsufficientSamples { .. } => 3,
            PipelineError::FitDidNotConverge { .. } | PipelineError::DivisionByZero { .. } => 4,
            PipelineError::Specimen { .. } => 1,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specimen_wrapper_keeps_inner_exit_code() {
        let err = PipelineError::FitDidNotConverge {
            id: "S1".to_string(),
            message: "iteration limit".to_string(),
        }
        .for_specimen("S1");

        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().starts_with("Specimen 'S1'"));

        let app: AppError = err.into();
        assert_eq!(app.exit_code(), 4);
    }

    #[test]
    fn for_specimen_does_not_double_wrap() {
        let err = PipelineError::DegenerateCurve {
            id: "A".to_string(),
            message: "equal strains".to_string(),
        }
        .for_specimen("A")
        .for_specimen("A");

        match err {
            PipelineError::Specimen { source, .. } => {
                assert!(matches!(*source, PipelineError::DegenerateCurve { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn config_message_mentions_specimen() {
        let err = PipelineError::Config {
            line: 4,
            id: Some("07".to_string()),
            message: "width must be > 0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Config error (line 4, specimen '07'): width must be > 0"
        );
        assert_eq!(err.exit_code(), 2);
    }
}
