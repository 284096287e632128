//! Error types for the wxcfg-core library.
//!
//! Every stage returns [`Result`]; the pipeline driver wraps whatever escapes a
//! stage into a single [`Error::ParseFailed`] so callers see one failure kind
//! carrying the original message.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for wxcfg operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all wxcfg operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create output directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Output file exists and overwriting was not requested
    #[error("file already exists: '{path}'")]
    FileExists {
        /// The existing file
        path: PathBuf,
    },

    /// Path traversal attempt detected (security error)
    #[error("path traversal detected: '{path}' would escape output directory")]
    PathTraversal {
        /// The suspicious path
        path: PathBuf,
    },

    /// Malformed JSON in a configuration document or embedded literal
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The runtime script could not be tokenized or parsed
    #[error("script syntax error at offset {offset}: {details}")]
    ScriptSyntax {
        /// Byte offset where the error occurred
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// A field required by the pipeline is absent
    #[error("missing required field '{field}'")]
    MissingField {
        /// Name of the absent field
        field: String,
    },

    /// A field is present but has an unusable shape
    #[error("invalid field '{field}': {details}")]
    InvalidField {
        /// Name of the offending field
        field: String,
        /// Detailed description of the issue
        details: String,
    },

    /// Any failure raised while reconstructing a configuration tree
    #[error("parse failed: {source}")]
    ParseFailed {
        /// The stage failure that aborted the run
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a new path traversal error
    pub fn path_traversal(path: impl Into<PathBuf>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Creates a new script syntax error
    pub fn script_syntax(offset: usize, details: impl Into<String>) -> Self {
        Self::ScriptSyntax {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates a new invalid field error
    pub fn invalid_field(field: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            details: details.into(),
        }
    }

    /// Wraps a stage failure into the single reported parse failure.
    ///
    /// Already-wrapped errors are returned unchanged.
    pub fn parse_failed(source: Error) -> Self {
        match source {
            Self::ParseFailed { .. } => source,
            other => Self::ParseFailed {
                source: Box::new(other),
            },
        }
    }

    /// Returns true if this error came out of the reconstruction pipeline
    /// rather than from persisting its results
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::ParseFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::path_traversal("/etc/passwd");
        assert!(err.to_string().contains("path traversal"));
        assert!(err.to_string().contains("/etc/passwd"));
    }

    #[test]
    fn test_parse_failed_carries_original_message() {
        let err = Error::parse_failed(Error::missing_field("pages"));
        assert!(err.is_parse_failure());
        assert_eq!(
            err.to_string(),
            "parse failed: missing required field 'pages'"
        );
    }

    #[test]
    fn test_parse_failed_does_not_nest() {
        let once = Error::parse_failed(Error::invalid_field("tabBar", "boom"));
        let twice = Error::parse_failed(once);
        assert_eq!(twice.to_string(), "parse failed: invalid field 'tabBar': boom");
    }
}
