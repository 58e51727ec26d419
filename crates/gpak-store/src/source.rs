use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::error::StoreResult;

/// Immutable container bytes: owned or memory-mapped.
#[derive(Debug)]
pub enum ContainerBytes {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl ContainerBytes {
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self::Owned(bytes)
    }

    /// Read a file fully into memory.
    pub fn read(path: &Path) -> StoreResult<Self> {
        Ok(Self::Owned(std::fs::read(path)?))
    }

    /// Map a file read-only.
    ///
    /// Empty files are read instead, since a zero-length mapping is an error
    /// on some platforms. No lock is taken on the file: another process that
    /// truncates or rewrites it while the mapping lives makes reads through
    /// the mapping undefined. Use [`ContainerBytes::read`] when the file may
    /// change underneath.
    pub fn map(path: &Path) -> StoreResult<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(Self::Owned(Vec::new()));
        }
        // SAFETY: the mapping is read-only and never outlives `Self`.
        // Containers are immutable once written, and the caller guarantees
        // the file is not truncated or rewritten while it is mapped; there is
        // no advisory lock enforcing that.
        let map = unsafe { Mmap::map(&file)? };
        debug!(path = %path.display(), len, "container mapped");
        Ok(Self::Mapped(map))
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped(_))
    }
}

impl Deref for ContainerBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Owned(bytes) => bytes.as_slice(),
            Self::Mapped(map) => &map[..],
        }
    }
}
