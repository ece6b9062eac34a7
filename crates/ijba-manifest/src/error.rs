use std::path::PathBuf;
use thiserror::Error;

pub type ManifestResult<T> = Result<T, ManifestError>;

/// Structural failures while reading a manifest.
///
/// All of them abort the enclosing load: a partially parsed manifest would change
/// template sizes and therefore benchmark counts.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("{}:{line}: expected {expected} columns, found {found}", file.display())]
    MalformedRecord {
        file: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("{}:{line}: bounding box field `{field}` is empty", file.display())]
    IncompleteAnnotation {
        file: PathBuf,
        line: usize,
        field: &'static str,
    },

    #[error("{}:{line}: column {column} holds invalid value {value:?}", file.display())]
    InvalidField {
        file: PathBuf,
        line: usize,
        column: usize,
        value: String,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ManifestError {
    /// The manifest the error was raised for.
    pub fn file(&self) -> &std::path::Path {
        match self {
            ManifestError::MalformedRecord { file, .. }
            | ManifestError::IncompleteAnnotation { file, .. }
            | ManifestError::InvalidField { file, .. } => file,
            ManifestError::Io { path, .. } => path,
        }
    }

    /// 1-based line number, when the error is tied to a row.
    pub fn line(&self) -> Option<usize> {
        match self {
            ManifestError::MalformedRecord { line, .. }
            | ManifestError::IncompleteAnnotation { line, .. }
            | ManifestError::InvalidField { line, .. } => Some(*line),
            ManifestError::Io { .. } => None,
        }
    }
}
