use gpak_codec::CodecError;
use gpak_store::StoreError;
use gpak_tables::TableError;
use thiserror::Error;

use crate::opcode::{ObjectHandle, SkipId};

/// An opcode stream that cannot be laid out.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("skip {id} opened twice")]
    DuplicateSkip { id: SkipId },

    #[error("skip label {id} has no open header")]
    UnmatchedLabel { id: SkipId },

    #[error("skip label {found} closes a region while {expected} is still open")]
    ImproperNesting { expected: SkipId, found: SkipId },

    #[error("skip header {id} is never closed")]
    UnclosedSkip { id: SkipId },

    #[error("object pointer to {handle} but only {objects} objects are saved")]
    DanglingHandle { handle: ObjectHandle, objects: usize },

    #[error("skip {id} needs {needed} bytes but reserved {reserved}")]
    ReservationExceeded {
        id: SkipId,
        reserved: usize,
        needed: usize,
    },

    #[error("data block of {len} bytes does not fit a {width}-byte length prefix")]
    BlockTooLarge { width: usize, len: usize },

    #[error("{what} of {len} bytes exceeds the 32-bit size limit")]
    TooLarge { what: &'static str, len: usize },
}

/// Errors from laying out or writing a container.
#[derive(Debug, Error)]
pub enum BinarizeError {
    #[error("encoding invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("table builder already holds {exports} exports and {buffers} buffers")]
    BuilderNotEmpty { exports: usize, buffers: usize },

    #[error("table error: {0}")]
    Table(#[from] TableError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type BinarizeResult<T> = Result<T, BinarizeError>;
