use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::ContainerSink;

/// Sink writing straight to a file.
///
/// No internal buffering: the binarizer accumulates bytes itself and hands
/// them over in blocks. `write` forwards one `File::write` call, so a short
/// write from the OS surfaces unchanged.
pub struct FileSink {
    file: File,
    path: PathBuf,
    pos: u64,
    len: u64,
}

impl FileSink {
    /// Create (or truncate) a file at `path`.
    pub fn create(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .read(true)
            .truncate(true)
            .open(path)?;
        debug!(path = %path.display(), "container sink opened");
        Ok(Self {
            file,
            path: path.to_path_buf(),
            pos: 0,
            len: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush OS buffers to disk.
    pub fn sync(&mut self) -> StoreResult<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

impl ContainerSink for FileSink {
    fn write(&mut self, bytes: &[u8]) -> StoreResult<usize> {
        if bytes.is_empty() {
            return Ok(0);
        }
        let written = self.file.write(bytes)?;
        self.pos += written as u64;
        self.len = self.len.max(self.pos);
        Ok(written)
    }

    fn seek(&mut self, offset: u64) -> StoreResult<()> {
        if offset > self.len {
            return Err(StoreError::SeekOutOfRange {
                offset,
                len: self.len,
            });
        }
        self.file.seek(SeekFrom::Start(offset))?;
        self.pos = offset;
        Ok(())
    }

    fn pos(&self) -> u64 {
        self.pos
    }
}
