use crate::error::{StoreError, StoreResult};
use crate::traits::ContainerSink;

/// In-memory sink backed by a `Vec<u8>`.
///
/// Intended for tests and embedding. An optional byte limit makes the sink
/// accept only part of a write once the limit is reached, which is how a
/// full disk looks to the caller.
#[derive(Debug, Default)]
pub struct MemorySink {
    data: Vec<u8>,
    pos: usize,
    limit: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that never holds more than `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl ContainerSink for MemorySink {
    fn write(&mut self, bytes: &[u8]) -> StoreResult<usize> {
        let room = match self.limit {
            Some(limit) => limit.saturating_sub(self.pos),
            None => usize::MAX,
        };
        let accepted = bytes.len().min(room);
        let end = self.pos + accepted;
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(&bytes[..accepted]);
        self.pos = end;
        Ok(accepted)
    }

    fn seek(&mut self, offset: u64) -> StoreResult<()> {
        let len = self.data.len() as u64;
        if offset > len {
            return Err(StoreError::SeekOutOfRange { offset, len });
        }
        self.pos = offset as usize;
        Ok(())
    }

    fn pos(&self) -> u64 {
        self.pos as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_patch() {
        let mut sink = MemorySink::new();
        sink.write_all(b"hello world").unwrap();
        sink.seek(0).unwrap();
        sink.write_all(b"HELLO").unwrap();
        assert_eq!(sink.pos(), 5);
        sink.seek(sink.len() as u64).unwrap();
        sink.write_all(b"!").unwrap();
        assert_eq!(sink.as_bytes(), b"HELLO world!");
    }

    #[test]
    fn limit_produces_short_write() {
        let mut sink = MemorySink::with_limit(4);
        assert_eq!(sink.write(b"ab").unwrap(), 2);
        let err = sink.write_all(b"cdef").unwrap_err();
        assert!(matches!(
            err,
            StoreError::ShortWrite {
                offset: 2,
                expected: 4,
                written: 2
            }
        ));
        assert_eq!(sink.as_bytes(), b"abcd");
    }

    #[test]
    fn seek_past_end_fails() {
        let mut sink = MemorySink::new();
        sink.write_all(b"abc").unwrap();
        assert!(matches!(
            sink.seek(10),
            Err(StoreError::SeekOutOfRange { offset: 10, len: 3 })
        ));
    }

    #[test]
    fn empty_sink() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        assert_eq!(sink.pos(), 0);
    }
}
