/// Errors from sink and source operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend accepted fewer bytes than requested.
    #[error("short write at offset {offset}: {written} of {expected} bytes accepted")]
    ShortWrite {
        offset: u64,
        expected: usize,
        written: usize,
    },

    /// Seek target lies past the end of the written data.
    #[error("seek to {offset} is beyond the end of the sink ({len} bytes)")]
    SeekOutOfRange { offset: u64, len: u64 },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
