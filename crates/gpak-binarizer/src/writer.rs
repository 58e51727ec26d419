use gpak_codec::RollingChecksum;
use gpak_store::{ContainerSink, StoreResult};
use tracing::warn;

/// Size of the accumulation buffer.
pub const WRITE_BLOCK: usize = 4096;

/// What a [`ChecksumWriter`] produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionSummary {
    pub checksum: u64,
    pub bytes: u64,
}

/// Accumulates region bytes in fixed blocks and checksums what it flushes.
///
/// The buffer is flushed when full, on [`ChecksumWriter::finish`], and on
/// drop. A failed flush discards the buffered bytes: the failure is returned
/// (or logged, on drop) and never retried.
pub struct ChecksumWriter<'s> {
    sink: &'s mut dyn ContainerSink,
    buf: Vec<u8>,
    checksum: RollingChecksum,
    flushed: u64,
}

impl<'s> ChecksumWriter<'s> {
    pub fn new(sink: &'s mut dyn ContainerSink) -> Self {
        Self {
            sink,
            buf: Vec::with_capacity(WRITE_BLOCK),
            checksum: RollingChecksum::REGION,
            flushed: 0,
        }
    }

    pub fn write(&mut self, mut bytes: &[u8]) -> StoreResult<()> {
        while !bytes.is_empty() {
            let take = bytes.len().min(WRITE_BLOCK - self.buf.len());
            self.buf.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
            if self.buf.len() == WRITE_BLOCK {
                self.flush()?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> StoreResult<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let result = self.sink.write_all(&self.buf);
        if result.is_ok() {
            self.checksum.update(&self.buf);
            self.flushed += self.buf.len() as u64;
        }
        self.buf.clear();
        result
    }

    /// Flush the remainder and report the region checksum.
    pub fn finish(mut self) -> StoreResult<RegionSummary> {
        self.flush()?;
        Ok(RegionSummary {
            checksum: self.checksum.finish(),
            bytes: self.flushed,
        })
    }
}

impl Drop for ChecksumWriter<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "dropped region writer failed to flush");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpak_store::{MemorySink, StoreError};

    #[test]
    fn checksum_is_independent_of_write_sizes() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

        let mut a = MemorySink::new();
        let mut writer = ChecksumWriter::new(&mut a);
        writer.write(&data).unwrap();
        let one = writer.finish().unwrap();

        let mut b = MemorySink::new();
        let mut writer = ChecksumWriter::new(&mut b);
        for piece in data.chunks(7) {
            writer.write(piece).unwrap();
        }
        let many = writer.finish().unwrap();

        let mut whole = RollingChecksum::REGION;
        whole.update(&data);
        assert_eq!(one, many);
        assert_eq!(one.checksum, whole.finish());
        assert_eq!(one.bytes, 10_000);
        assert_eq!(a.as_bytes(), data.as_slice());
    }

    #[test]
    fn drop_flushes_remainder() {
        let mut sink = MemorySink::new();
        {
            let mut writer = ChecksumWriter::new(&mut sink);
            writer.write(b"tail").unwrap();
        }
        assert_eq!(sink.as_bytes(), b"tail");
    }

    #[test]
    fn short_write_surfaces_once_block_fills() {
        let mut sink = MemorySink::with_limit(100);
        let mut writer = ChecksumWriter::new(&mut sink);
        let err = writer.write(&[0u8; WRITE_BLOCK]).unwrap_err();
        assert!(matches!(err, StoreError::ShortWrite { written: 100, .. }));
        // Nothing is left to retry.
        assert!(writer.finish().is_ok());
    }
}
