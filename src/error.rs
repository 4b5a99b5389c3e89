use thiserror::Error;

/// Errors produced by every engine in this crate.
///
/// All fallible public methods return `Result<T, Error>`. Training and
/// construction failures never leave an engine partially mutated; load
/// failures may leave the caller holding a partially-consumed reader.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("label must not be empty")]
    EmptyLabel,

    #[error("value at '{0}' is not numeric")]
    TypeError(String),

    #[error("bit width mismatch: array expects {expected}, got {actual}")]
    ShapeMismatch { expected: u32, actual: u32 },

    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: u64, len: u64 },

    #[error("capacity exceeded: cannot grow past {0} elements")]
    CapacityExceeded(u64),

    #[error("algorithm mismatch: expected '{expected}', found '{found}'")]
    AlgorithmMismatch { expected: String, found: String },

    #[error("unsupported snapshot format version: {0}")]
    UnsupportedVersion(u8),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
