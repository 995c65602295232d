//! Error types for gffstream

use thiserror::Error;

/// Result type alias for gffstream operations
pub type Result<T> = std::result::Result<T, GffError>;

/// Error types that can occur while parsing or rewriting GFF3
#[derive(Debug, Error)]
pub enum GffError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path could not be opened
    #[error("cannot open {path}: {source}")]
    OpenPath {
        /// Path that failed to open
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A line is not blank, not a directive or comment, and does not split
    /// into nine tab-separated fields
    #[error("invalid feature line at {file}:{line}: {msg}")]
    InvalidFeatureLine {
        /// Source name where the error occurred
        file: String,
        /// Line number where the error occurred (1-based)
        line: usize,
        /// Error message
        msg: String,
    },

    /// Pending `Parent`/`Derives_from` references remained after a flush
    /// boundary (`###`, `##FASTA`, or end of input)
    #[error("unresolved references at {file}:{line}: {targets:?}")]
    UnresolvedReferences {
        /// Source name of the flush boundary
        file: String,
        /// Line number of the flush boundary (1-based)
        line: usize,
        /// Unresolved `target-id (attribute)` descriptors
        targets: Vec<String>,
    },

    /// Disk-backed temp store serialization failure
    #[error("temp store error: {0}")]
    Store(String),
}

impl GffError {
    /// Fill in source name and line number on errors raised by the codec or
    /// temp store, which have no positional context of their own.
    pub(crate) fn at(self, file: &str, line: usize) -> Self {
        match self {
            GffError::InvalidFeatureLine { file: f, msg, .. } if f.is_empty() => {
                GffError::InvalidFeatureLine {
                    file: file.to_string(),
                    line,
                    msg,
                }
            }
            GffError::UnresolvedReferences { file: f, targets, .. } if f.is_empty() => {
                GffError::UnresolvedReferences {
                    file: file.to_string(),
                    line,
                    targets,
                }
            }
            other => other,
        }
    }

    /// Shorthand for a codec-level feature line error without positional
    /// context; the parser fills in file and line via [`GffError::at`].
    pub(crate) fn line_parse(msg: impl Into<String>) -> Self {
        GffError::InvalidFeatureLine {
            file: String::new(),
            line: 0,
            msg: msg.into(),
        }
    }
}
