// In: src/error.rs

//! This module defines the single, unified error type for the entire afval library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Every codec failure is fatal for the artifact being built or read: there is no
//! partial output. A point that falls outside every area, or a weighing with no
//! container within the cutoff distance, is *not* an error and never shows up here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AfvalError {
    // =========================================================================
    // === Codec Errors (fatal for the artifact being processed)
    // =========================================================================
    /// A primitive received input it cannot represent losslessly, e.g. joining
    /// `[""]` or scaling a string.
    #[error("Encoding violation: {0}")]
    EncodingViolation(String),

    /// A cross-reference or index code that does not resolve against its table.
    #[error("Reference error: {0}")]
    ReferenceError(String),

    /// The transform specification names an unknown primitive code, a missing
    /// field, or an index table that is not available when it is needed.
    #[error("Specification mismatch: {0}")]
    SpecMismatch(String),

    // =========================================================================
    // === Spatial Errors
    // =========================================================================
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the underlying I/O subsystem (e.g., a read-only directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically while loading a dataset or artifact.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// A source timestamp that could not be parsed.
    #[error("Date parse error: {0}")]
    DateParse(#[from] chrono::ParseError),
}

impl AfvalError {
    /// Wraps an error with the field whose chain produced it, keeping the variant.
    pub(crate) fn in_field(self, channel: &str, field: &str) -> Self {
        let at = |msg: String| format!("{channel}.{field}: {msg}");
        match self {
            AfvalError::EncodingViolation(m) => AfvalError::EncodingViolation(at(m)),
            AfvalError::ReferenceError(m) => AfvalError::ReferenceError(at(m)),
            AfvalError::SpecMismatch(m) => AfvalError::SpecMismatch(at(m)),
            other => other,
        }
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, AfvalError>;
