use crate::adaptive;
use crate::error::{CodecError, CodecResult};

/// Bounds-checked cursor over a byte slice.
///
/// Fixed-width integers are read in native byte order, matching how the
/// writer emits them.
#[derive(Clone, Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(CodecError::UnexpectedEof {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> CodecResult<u16> {
        self.read_array().map(u16::from_ne_bytes)
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        self.read_array().map(u32::from_ne_bytes)
    }

    pub fn read_u64(&mut self) -> CodecResult<u64> {
        self.read_array().map(u64::from_ne_bytes)
    }

    pub fn read_adaptive_i32(&mut self) -> CodecResult<i32> {
        let (value, consumed) =
            adaptive::decode_i32(&self.bytes[self.pos..]).map_err(|e| self.locate(e))?;
        self.pos += consumed;
        Ok(value)
    }

    pub fn read_adaptive_u32(&mut self) -> CodecResult<u32> {
        let (value, consumed) =
            adaptive::decode_u32(&self.bytes[self.pos..]).map_err(|e| self.locate(e))?;
        self.pos += consumed;
        Ok(value)
    }

    fn locate(&self, err: CodecError) -> CodecError {
        match err {
            CodecError::Truncated => CodecError::UnexpectedEof {
                offset: self.pos,
                needed: self.remaining() + 1,
                available: self.remaining(),
            },
            other => other,
        }
    }
}
