use crate::error::{StoreError, StoreResult};

/// Destination for container bytes.
///
/// All implementations must satisfy these invariants:
/// - `write` appends or overwrites at `pos()` and advances it by the number
///   of bytes accepted, which may be fewer than requested.
/// - `seek` moves to an absolute offset no larger than the bytes written so
///   far; it is used to patch a header after the rest of the file is known.
/// - Errors are reported, never retried.
pub trait ContainerSink {
    /// Write as much of `bytes` as the backend accepts and return that count.
    fn write(&mut self, bytes: &[u8]) -> StoreResult<usize>;

    /// Move the write position to an absolute offset.
    fn seek(&mut self, offset: u64) -> StoreResult<()>;

    /// Current write position.
    fn pos(&self) -> u64;

    /// Write every byte or fail with [`StoreError::ShortWrite`].
    fn write_all(&mut self, bytes: &[u8]) -> StoreResult<()> {
        let offset = self.pos();
        let written = self.write(bytes)?;
        if written != bytes.len() {
            return Err(StoreError::ShortWrite {
                offset,
                expected: bytes.len(),
                written,
            });
        }
        Ok(())
    }
}

impl<S: ContainerSink + ?Sized> ContainerSink for &mut S {
    fn write(&mut self, bytes: &[u8]) -> StoreResult<usize> {
        (**self).write(bytes)
    }

    fn seek(&mut self, offset: u64) -> StoreResult<()> {
        (**self).seek(offset)
    }

    fn pos(&self) -> u64 {
        (**self).pos()
    }
}
