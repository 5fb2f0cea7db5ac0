//! Error kinds for database construction.
//!
//! Every failure is fatal to the run: the CLI prints one line
//! `seeddb: {description}` and exits non-zero. Allocation failures on the
//! large buffers are reported as [`Error::OutOfMemory`] with a deliberately
//! terse message.

use std::collections::TryReserveError;
use std::io;

/// Errors produced by the indexing pipeline.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed sequence data: bad FASTA/FASTQ records, invalid quality
    /// bytes, or a single record too long for one volume.
    #[error("bad sequence data: {0}")]
    BadInput(String),

    /// Conflicting or out-of-range build options.
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// Empty or unparseable seed specification.
    #[error("bad seed pattern: {0}")]
    BadSeed(String),

    /// Open/read/write failure, with the operation that failed.
    #[error("{msg}: {source}")]
    Io {
        /// What was being done, e.g. `can't write file: x.suf`.
        msg: String,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// Allocation failure on a text buffer, position vector or bucket table.
    #[error("out of memory")]
    OutOfMemory,
}

impl Error {
    /// Wrap an I/O error with the operation it interrupted.
    pub fn io(msg: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            msg: msg.into(),
            source,
        }
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::Io {
            msg: "I/O error".into(),
            source,
        }
    }
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Error::OutOfMemory
    }
}

/// Result type for all library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_memory_is_terse() {
        let mut v: Vec<u8> = Vec::new();
        let err: Error = v.try_reserve(usize::MAX).unwrap_err().into();
        assert_eq!(err.to_string(), "out of memory");
    }

    #[test]
    fn test_io_error_keeps_context() {
        let err = Error::io(
            "can't write file: x.suf",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().starts_with("can't write file: x.suf"));
    }
}
