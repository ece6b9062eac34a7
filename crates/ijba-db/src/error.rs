use ijba_manifest::{ManifestError, TemplateId};
use std::path::PathBuf;
use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// Caller passed a value outside a fixed enumeration.
    #[error("invalid {parameter} {value:?}; allowed: {}", allowed.join(", "))]
    InvalidParameter {
        parameter: &'static str,
        value: String,
        allowed: Vec<String>,
    },

    #[error("unknown protocol {0:?}; expected search_split1..10 or compare_split1..10")]
    UnknownProtocol(String),

    #[error("model ids are required for probe queries on {protocol}: each model has its own probe set")]
    MissingModelIds { protocol: String },

    #[error("{}:{line}: comparison references template {template_id} that is not part of the protocol", manifest.display())]
    UnresolvedComparison {
        manifest: PathBuf,
        line: usize,
        template_id: TemplateId,
    },

    #[error("file {} does not exist", path.display())]
    FileNotFound { path: PathBuf },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

impl DbError {
    pub(crate) fn invalid<I, S>(parameter: &'static str, value: &str, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        DbError::InvalidParameter {
            parameter,
            value: value.to_string(),
            allowed: allowed.into_iter().map(|s| s.to_string()).collect(),
        }
    }
}
