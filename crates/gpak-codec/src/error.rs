use gpak_types::CompressionType;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("adaptive integer truncated before its terminating byte")]
    Truncated,

    #[error("adaptive integer does not fit the target type")]
    Overflow,

    #[error("negative adaptive integer where an unsigned value was expected")]
    Negative,

    #[error("cannot encode {value} in {width} bytes")]
    InvalidWidth { value: u64, width: usize },

    #[error("unexpected end of input at offset {offset}: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("unsupported compression type: {0}")]
    UnsupportedCompression(CompressionType),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("decompressed size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

pub type CodecResult<T> = Result<T, CodecError>;
