//! Symbolic opcodes: the input form of an object body.
//!
//! Names and references are carried as text and keys here; the layout pass
//! interns them through the table builder and replaces them with indices.

use std::fmt;

use gpak_codec::{checksum64, BufferCodec};
use gpak_types::{BufferInfo, CompressionType, ResourceKey};

use crate::error::{BinarizeResult, InvariantViolation};

/// Pairs a skip header with its label within one object body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SkipId(pub u32);

impl fmt::Display for SkipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of an object in the slice passed to a save.
///
/// Objects become exports in the same order, so a handle is the export index
/// the pointer will resolve to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u32);

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object {}", self.0)
    }
}

/// A buffer payload stored out of line in the buffer region.
///
/// `stored` holds the bytes as they go to disk (already compressed);
/// `checksum` is computed over the uncompressed payload and identifies the
/// buffer within the container.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingBuffer {
    pub checksum: u64,
    pub uncompressed_size: u32,
    pub compression: CompressionType,
    pub stored: Vec<u8>,
}

impl PendingBuffer {
    /// Compress `data` with `kind` and key it by its checksum.
    pub fn compress(
        data: &[u8],
        kind: CompressionType,
        codec: &dyn BufferCodec,
    ) -> BinarizeResult<Self> {
        let uncompressed_size = size_u32("buffer", data.len())?;
        let stored = codec.compress(kind, data)?;
        size_u32("compressed buffer", stored.len())?;
        Ok(Self {
            checksum: checksum64(data),
            uncompressed_size,
            compression: kind,
            stored,
        })
    }

    /// Store `data` uncompressed.
    pub fn uncompressed(data: &[u8]) -> BinarizeResult<Self> {
        Ok(Self {
            checksum: checksum64(data),
            uncompressed_size: size_u32("buffer", data.len())?,
            compression: CompressionType::None,
            stored: data.to_vec(),
        })
    }

    /// Wrap bytes that are already in their stored form, e.g. copied from
    /// another container.
    pub fn from_stored(
        checksum: u64,
        uncompressed_size: u32,
        compression: CompressionType,
        stored: Vec<u8>,
    ) -> Self {
        Self {
            checksum,
            uncompressed_size,
            compression,
            stored,
        }
    }

    pub fn compressed_size(&self) -> BinarizeResult<u32> {
        size_u32("compressed buffer", self.stored.len())
    }

    /// Buffer metadata once the payload is placed at `file_offset`.
    pub fn info_at(&self, file_offset: u64) -> BinarizeResult<BufferInfo> {
        Ok(BufferInfo {
            checksum: self.checksum,
            file_offset,
            compressed_size: self.compressed_size()?,
            uncompressed_size: self.uncompressed_size,
            compression: self.compression,
        })
    }
}

impl fmt::Debug for PendingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingBuffer")
            .field("checksum", &format_args!("{:#018x}", self.checksum))
            .field("uncompressed_size", &self.uncompressed_size)
            .field("compression", &self.compression)
            .field("stored_len", &self.stored.len())
            .finish()
    }
}

pub(crate) fn size_u32(what: &'static str, len: usize) -> BinarizeResult<u32> {
    u32::try_from(len).map_err(|_| InvariantViolation::TooLarge { what, len }.into())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BufferRef {
    Inline(Vec<u8>),
    Deferred(PendingBuffer),
}

/// One symbolic opcode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Opcode {
    SkipHeader(SkipId),
    SkipLabel(SkipId),
    Property {
        class: String,
        name: String,
        value_type: String,
    },
    DataBlock1(Vec<u8>),
    DataBlock2(Vec<u8>),
    DataBlock4(Vec<u8>),
    DataTypeRef(String),
    DataName(String),
    DataObjectPointer(Option<ObjectHandle>),
    DataResourceRef(ResourceKey),
    DataAdaptiveNumber(i32),
    DataInlineBuffer(BufferRef),
}

/// Builder for well-formed opcode vectors.
///
/// Skip regions are opened with [`OpcodeStream::begin_skip`] and closed
/// innermost-first with [`OpcodeStream::end_skip`]; [`OpcodeStream::finish`]
/// fails if any region is left open or closed twice.
#[derive(Debug, Default)]
pub struct OpcodeStream {
    ops: Vec<Opcode>,
    open: Vec<SkipId>,
    next_skip: u32,
    unbalanced: bool,
}

impl OpcodeStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: Opcode) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn begin_skip(&mut self) -> SkipId {
        let id = SkipId(self.next_skip);
        self.next_skip += 1;
        self.open.push(id);
        self.ops.push(Opcode::SkipHeader(id));
        id
    }

    pub fn end_skip(&mut self) -> &mut Self {
        match self.open.pop() {
            Some(id) => self.ops.push(Opcode::SkipLabel(id)),
            None => self.unbalanced = true,
        }
        self
    }

    pub fn property(&mut self, class: &str, name: &str, value_type: &str) -> &mut Self {
        self.push(Opcode::Property {
            class: class.to_owned(),
            name: name.to_owned(),
            value_type: value_type.to_owned(),
        })
    }

    /// A data block with the narrowest length prefix that fits.
    pub fn block(&mut self, bytes: &[u8]) -> &mut Self {
        let op = if bytes.len() <= usize::from(u8::MAX) {
            Opcode::DataBlock1(bytes.to_vec())
        } else if bytes.len() <= usize::from(u16::MAX) {
            Opcode::DataBlock2(bytes.to_vec())
        } else {
            Opcode::DataBlock4(bytes.to_vec())
        };
        self.push(op)
    }

    pub fn type_ref(&mut self, type_name: &str) -> &mut Self {
        self.push(Opcode::DataTypeRef(type_name.to_owned()))
    }

    pub fn name(&mut self, name: &str) -> &mut Self {
        self.push(Opcode::DataName(name.to_owned()))
    }

    pub fn object(&mut self, target: Option<ObjectHandle>) -> &mut Self {
        self.push(Opcode::DataObjectPointer(target))
    }

    pub fn resource(&mut self, key: ResourceKey) -> &mut Self {
        self.push(Opcode::DataResourceRef(key))
    }

    pub fn number(&mut self, value: i32) -> &mut Self {
        self.push(Opcode::DataAdaptiveNumber(value))
    }

    pub fn inline_buffer(&mut self, bytes: &[u8]) -> &mut Self {
        self.push(Opcode::DataInlineBuffer(BufferRef::Inline(bytes.to_vec())))
    }

    pub fn deferred_buffer(&mut self, buffer: PendingBuffer) -> &mut Self {
        self.push(Opcode::DataInlineBuffer(BufferRef::Deferred(buffer)))
    }

    pub fn finish(self) -> BinarizeResult<Vec<Opcode>> {
        if let Some(&id) = self.open.last() {
            return Err(InvariantViolation::UnclosedSkip { id }.into());
        }
        if self.unbalanced {
            return Err(InvariantViolation::UnmatchedLabel {
                id: SkipId(self.next_skip),
            }
            .into());
        }
        Ok(self.ops)
    }
}
