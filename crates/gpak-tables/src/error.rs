use gpak_codec::CodecError;
use gpak_store::StoreError;
use thiserror::Error;

use crate::header::ChunkKind;

/// Errors from reading, validating or writing symbol tables.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("header too short: {actual} bytes, need {required}")]
    HeaderTooShort { actual: usize, required: usize },

    #[error("invalid magic: expected {expected:?}, found {actual:?}")]
    InvalidMagic { expected: [u8; 4], actual: [u8; 4] },

    #[error("container version {version} is deprecated (minimum {min})")]
    DeprecatedVersion { version: u32, min: u32 },

    #[error("container version {version} is newer than supported (maximum {max})")]
    UnsupportedVersion { version: u32, max: u32 },

    #[error("header checksum mismatch: stored {expected:#010x}, computed {actual:#010x}")]
    HeaderChecksumMismatch { expected: u32, actual: u32 },

    #[error("{chunk} chunk out of bounds: offset {offset}, size {size}, limit {limit}")]
    ChunkOutOfBounds {
        chunk: ChunkKind,
        offset: u64,
        size: u64,
        limit: u64,
    },

    #[error("{chunk} chunk checksum mismatch: stored {expected:#010x}, computed {actual:#010x}")]
    ChunkChecksumMismatch {
        chunk: ChunkKind,
        expected: u32,
        actual: u32,
    },

    #[error("{chunk} chunk size {size} does not hold {count} records of {record_size} bytes")]
    ChunkSizeMismatch {
        chunk: ChunkKind,
        count: u32,
        size: u64,
        record_size: usize,
    },

    #[error("{region} region [{start}, {end}) out of bounds (limit {limit})")]
    RegionOutOfBounds {
        region: &'static str,
        start: u64,
        end: u64,
        limit: u64,
    },

    #[error("{chunk} entry 0 must be the reserved empty entry")]
    ReservedEntry { chunk: ChunkKind },

    #[error("{chunk} entry {entry}: {field} {index} out of range (bound {bound})")]
    IndexOutOfRange {
        chunk: ChunkKind,
        entry: u32,
        field: &'static str,
        index: u64,
        bound: u64,
    },

    #[error("invalid text at offset {offset}: {reason}")]
    InvalidText { offset: u64, reason: String },

    #[error("{chunk} has no entry {index} ({count} entries)")]
    EntryNotFound {
        chunk: ChunkKind,
        index: u64,
        count: u64,
    },

    #[error("{chunk} table is full")]
    TableFull { chunk: ChunkKind },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type TableResult<T> = Result<T, TableError>;
