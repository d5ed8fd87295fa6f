//! Error types for HWX conversion

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, AnecError>;

/// Errors that can occur while reconstructing or serializing a layout.
///
/// Every variant is terminal for the conversion in progress. Only the
/// shape-ordering swap is retried, and that happens before an error is built.
#[derive(Debug, Error)]
pub enum AnecError {
    /// Input file not found
    #[error("Input file not found: {path}")]
    FileNotFound {
        /// Path that was attempted
        path: PathBuf,
    },

    /// Bytes do not have the expected structure
    #[error("Malformed input: {reason}")]
    MalformedInput {
        /// What failed to parse
        reason: String,
    },

    /// An expected marker or record is absent
    #[error("Region not found: {what}")]
    RegionNotFound {
        /// The marker or record that was searched for
        what: String,
    },

    /// A size field violates its alignment or bound
    #[error("Invalid {what} size 0x{size:x}: {constraint}")]
    InvalidSize {
        /// Which size field
        what: String,
        /// Value found in the blob
        size: u64,
        /// The constraint it breaks
        constraint: String,
    },

    /// Two independently derived views disagree
    #[error("Inconsistent layout: {reason}")]
    InconsistentLayout {
        /// Expected vs. found evidence
        reason: String,
    },

    /// A buffer record carries an unrecognised ident tuple
    #[error("Unknown buffer kind at 0x{address:x}: ident {ident:x?}")]
    UnknownBufferKind {
        /// Device address of the buffer record
        address: u64,
        /// Words +8..+12 of the record
        ident: [u32; 4],
    },

    /// A host-side layer appears to have been compiled in as an extra input
    #[error(
        "Suspected unresolved CPU layer: did you really mean {inputs} inputs? \
         Use force to bypass this check"
    )]
    SuspectedUnresolvedLayer {
        /// Number of source buffers declared by the blob
        inputs: u32,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl AnecError {
    /// Create a malformed input error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            reason: reason.into(),
        }
    }

    /// Create a region not found error
    pub fn region_not_found(what: impl Into<String>) -> Self {
        Self::RegionNotFound { what: what.into() }
    }

    /// Create an invalid size error
    pub fn invalid_size(what: impl Into<String>, size: u64, constraint: impl Into<String>) -> Self {
        Self::InvalidSize {
            what: what.into(),
            size,
            constraint: constraint.into(),
        }
    }

    /// Create an inconsistent layout error
    pub fn inconsistent(reason: impl Into<String>) -> Self {
        Self::InconsistentLayout {
            reason: reason.into(),
        }
    }
}
