//! Error types for archive rewriting.

use std::io;

use thiserror::Error;

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a rewrite.
///
/// Offsets are byte offsets into the input archive of the record header
/// being processed when the problem was found.
#[derive(Error, Debug)]
pub enum Error {
    /// The bytes at a header boundary are not `070701`.
    #[error("bad newc magic at offset {offset}")]
    BadMagic {
        /// Header offset.
        offset: u64,
    },

    /// An ASCII-hex field holds something other than hex digits, or a
    /// decoded field is inconsistent (e.g. a zero namesize).
    #[error("invalid {field} field in header at offset {offset}")]
    BadField {
        /// Header offset.
        offset: u64,
        /// Name of the offending field.
        field: &'static str,
    },

    /// The input ended before the trailer record was seen.
    #[error("archive truncated at offset {offset} (no TRAILER!!! record)")]
    TruncatedArchive {
        /// Offset of the record that could not be completed.
        offset: u64,
    },

    /// Caller-supplied metadata or payload does not fit the format.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// The underlying reader or writer failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Map an I/O error hit while reading the record at `offset`.
    ///
    /// Running out of input mid-record means the archive is truncated;
    /// anything else is surfaced verbatim.
    pub(crate) fn reading(err: io::Error, offset: u64) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::TruncatedArchive { offset }
        } else {
            Error::Io(err)
        }
    }

    /// Shift the offset carried by a decode error by `base`.
    pub(crate) fn rebase(self, base: u64) -> Self {
        match self {
            Error::BadMagic { offset } => Error::BadMagic {
                offset: offset + base,
            },
            Error::BadField { offset, field } => Error::BadField {
                offset: offset + base,
                field,
            },
            Error::TruncatedArchive { offset } => Error::TruncatedArchive {
                offset: offset + base,
            },
            other => other,
        }
    }
}
