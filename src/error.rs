//! Status and error types shared by both engines.

use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Non-fatal outcome of a `deflate`/`inflate` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "the step status says whether the caller must supply input, output or a dictionary"]
pub enum Status {
    /// Progress was made; call again with more input or output space.
    Ok,
    /// The logical stream is complete.
    StreamEnd,
    /// The zlib header announced a preset dictionary; supply it and continue.
    NeedDictionary,
    /// No progress was possible with the buffers supplied. Not fatal.
    BufError,
}

impl Status {
    /// The classic zlib integer code.
    pub fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::StreamEnd => 1,
            Status::NeedDictionary => 2,
            Status::BufError => -5,
        }
    }
}

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Invalid parameters or a call that is illegal in the current state.
    #[error("stream error: {0}")]
    Stream(&'static str),

    /// Malformed or corrupted compressed data, including checksum mismatches.
    #[error("data error: {0}")]
    Data(&'static str),

    /// A buffer could not be grown to the size required.
    #[error("insufficient memory: could not allocate {requested_bytes} bytes")]
    Mem { requested_bytes: usize },
}

impl Error {
    /// The classic zlib integer code.
    pub fn code(&self) -> i32 {
        match self {
            Error::Stream(_) => -2,
            Error::Data(_) => -3,
            Error::Mem { .. } => -4,
        }
    }

    /// Message recorded on the stream context when this error is returned.
    pub fn message(&self) -> &'static str {
        match self {
            Error::Stream(msg) | Error::Data(msg) => msg,
            Error::Mem { .. } => "insufficient memory",
        }
    }

    /// Data errors can be recovered from by resynchronizing on a full flush point.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Data(_))
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        let kind = match err {
            Error::Data(_) => std::io::ErrorKind::InvalidData,
            Error::Stream(_) => std::io::ErrorKind::InvalidInput,
            Error::Mem { .. } => std::io::ErrorKind::OutOfMemory,
        };
        std::io::Error::new(kind, err)
    }
}
