/// Unified error type for the scan engine
/// Every public entry point returns `ScanResult`; all four categories are
/// fatal for the scan in which they occur
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ScanError {
    /// Storage errors: bytes undeliverable (missing file, permission, transport fault)
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        path: Option<String>,
    },

    /// Format errors: bytes don't parse as a valid segment or row group,
    /// checksum mismatch, schema/column-count mismatch
    #[error("Format error: {message}")]
    Format {
        message: String,
        path: Option<String>,
    },

    /// Type coercion errors: predicate constant cannot convert to a column's
    /// comparable type
    #[error("Type coercion error: {message}")]
    TypeCoercion {
        message: String,
        column: Option<String>,
    },

    /// Consistency errors: merge-heap invariant violated, or the open-handle
    /// bound cannot be honored
    #[error("Consistency error: {message}")]
    Consistency { message: String },
}

impl ScanError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            path: None,
        }
    }

    pub fn storage_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
            path: None,
        }
    }

    pub fn format_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    pub fn coercion(message: impl Into<String>, column: impl Into<String>) -> Self {
        Self::TypeCoercion {
            message: message.into(),
            column: Some(column.into()),
        }
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<anyhow::Error> for ScanError {
    fn from(err: anyhow::Error) -> Self {
        Self::Consistency {
            message: err.to_string(),
        }
    }
}

/// Result type alias for scan operations
pub type ScanResult<T> = Result<T, ScanError>;
