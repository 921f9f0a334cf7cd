//! Error types for the review-loader crate.
//!
//! Two families of errors live here:
//! - `IngestError`: anything that aborts reading a review log
//! - `LookupError`: a registry was asked about an identifier or index it never saw
//!
//! Ingestion errors are fatal for that load attempt. Lookup errors are local
//! to a single query and never touch the loaded data.

use thiserror::Error;

/// Errors that can occur while ingesting a review log
///
/// Rust concept: `#[derive(Error)]` from thiserror implements `std::error::Error`
/// and `Display` from the `#[error(...)]` attributes
#[derive(Error, Debug)]
pub enum IngestError {
    /// Input file could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// The stream is not valid gzip, or the decompressed text is not UTF-8
    #[error("Failed to decode input at line {line}: {reason}")]
    Decode { line: usize, reason: String },

    /// Any other I/O failure while reading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A recognized record line carried a payload we cannot use
    #[error("Malformed {field} record at line {line} ({value:?}): {reason}")]
    MalformedRecord {
        line: usize,
        field: &'static str,
        value: String,
        reason: String,
    },

    /// A record appeared before the record it depends on
    #[error("Unexpected {found} at line {line}: expected {expected} first")]
    OutOfOrder {
        line: usize,
        found: &'static str,
        expected: &'static str,
    },
}

impl IngestError {
    /// True for the errors that mean the input itself could not be read
    /// (as opposed to being readable but malformed)
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            IngestError::FileNotFound { .. } | IngestError::Decode { .. } | IngestError::Io(_)
        )
    }
}

/// Errors returned by identifier registry lookups
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The external identifier was never registered
    #[error("Unknown {kind} identifier: {id}")]
    UnknownIdentifier { kind: &'static str, id: String },

    /// No identifier was ever assigned this index
    #[error("Unknown {kind} index: {index}")]
    UnknownIndex { kind: &'static str, index: u32 },
}

/// Convenience type alias for ingestion results in this crate
pub type Result<T> = std::result::Result<T, IngestError>;
