use gpak_codec::CodecError;
use gpak_store::StoreError;
use gpak_tables::TableError;
use gpak_types::ExportIndex;
use thiserror::Error;

/// Errors from opening or loading a container.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{what} of {len} exceeds the limit of {max}")]
    Capacity {
        what: &'static str,
        len: u64,
        max: u64,
    },

    #[error("export {export}: unknown opcode tag {tag:#04x} at offset {offset}")]
    UnknownOpcode {
        export: ExportIndex,
        offset: usize,
        tag: u8,
    },

    #[error("export {export}: malformed body at offset {offset}: {reason}")]
    MalformedBody {
        export: ExportIndex,
        offset: usize,
        reason: String,
    },

    #[error("no buffer with checksum {checksum:#018x}")]
    UnknownBuffer { checksum: u64 },

    #[error("{region} region checksum mismatch: stored {expected:#018x}, computed {actual:#018x}")]
    RegionChecksumMismatch {
        region: &'static str,
        expected: u64,
        actual: u64,
    },

    #[error("export {export} checksum mismatch: stored {expected:#010x}, computed {actual:#010x}")]
    ExportChecksumMismatch {
        export: ExportIndex,
        expected: u32,
        actual: u32,
    },

    #[error("buffer {checksum:#018x} decoded to checksum {actual:#018x}")]
    BufferChecksumMismatch { checksum: u64, actual: u64 },

    #[error("constructor rejected export {export}: {reason}")]
    Constructor { export: ExportIndex, reason: String },

    #[error("invalid load configuration: {0}")]
    InvalidConfig(String),

    #[error("buffer task failed: {0}")]
    Task(String),

    #[error("table error: {0}")]
    Table(#[from] TableError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type LoadResult<T> = Result<T, LoadError>;
