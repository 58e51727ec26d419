//! Fixed-size container header.
//!
//! Layout (native byte order, [`HEADER_SIZE`] bytes):
//!
//! ```text
//! 0    magic            [u8; 4]
//! 4    version          u32
//! 8    flags            u32
//! 12   header_crc       u32   crc32 of the header with this field = 0xFFFF_FFFF
//! 16   headers_end      u64   end of the last chunk
//! 24   objects_end      u64   end of the object body region
//! 32   buffers_end      u64   end of the buffer payload region
//! 40   objects_checksum u64
//! 48   buffers_checksum u64
//! 56   chunks           7 x { offset u64, size u64, count u32, crc32 u32 }
//! ```

use std::fmt;

use gpak_codec::{crc32, ByteReader};
use gpak_store::{ContainerSink, StoreResult};
use serde::Serialize;

use crate::error::{TableError, TableResult};

pub const MAGIC: [u8; 4] = *b"GPAK";

/// Oldest version this build reads.
pub const VERSION_MIN: u32 = 1;
/// Newest version this build reads; also the version it writes.
pub const VERSION_MAX: u32 = 2;
pub const VERSION_CURRENT: u32 = VERSION_MAX;

/// Value the crc field holds while the header checksum is computed.
pub const CRC_SENTINEL: u32 = 0xFFFF_FFFF;

const CHUNK_RECORD_SIZE: usize = 24;
const FIXED_FIELDS_SIZE: usize = 56;

pub const HEADER_SIZE: usize = FIXED_FIELDS_SIZE + ChunkKind::COUNT * CHUNK_RECORD_SIZE;

/// Header flag bits.
pub mod flags {
    /// The container carries a non-empty buffer table.
    pub const HAS_BUFFERS: u32 = 1 << 0;
    /// Tables were seeded from an earlier container.
    pub const INCREMENTAL: u32 = 1 << 1;
}

/// The seven chunks, in file order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Text,
    Names,
    Types,
    Properties,
    Imports,
    Exports,
    Buffers,
}

impl ChunkKind {
    pub const COUNT: usize = 7;

    pub const ALL: [ChunkKind; Self::COUNT] = [
        Self::Text,
        Self::Names,
        Self::Types,
        Self::Properties,
        Self::Imports,
        Self::Exports,
        Self::Buffers,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Names => "names",
            Self::Types => "types",
            Self::Properties => "properties",
            Self::Imports => "imports",
            Self::Exports => "exports",
            Self::Buffers => "buffers",
        }
    }

    /// Tables whose entry 0 is the reserved "none" entry.
    pub fn is_reserved(self) -> bool {
        !matches!(self, Self::Exports | Self::Buffers)
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Location and integrity data of one chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Offset from the start of the container.
    pub offset: u64,
    pub size: u64,
    /// Number of entries (strings for the text chunk).
    pub count: u32,
    pub crc32: u32,
}

impl Chunk {
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.size)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Header {
    pub magic: [u8; 4],
    pub version: u32,
    pub flags: u32,
    pub header_crc: u32,
    pub headers_end: u64,
    pub objects_end: u64,
    pub buffers_end: u64,
    pub objects_checksum: u64,
    pub buffers_checksum: u64,
    pub chunks: [Chunk; ChunkKind::COUNT],
}

impl Default for Header {
    fn default() -> Self {
        Self::new(VERSION_CURRENT, 0)
    }
}

impl Header {
    pub fn new(version: u32, flags: u32) -> Self {
        Self {
            magic: MAGIC,
            version,
            flags,
            header_crc: CRC_SENTINEL,
            headers_end: HEADER_SIZE as u64,
            objects_end: HEADER_SIZE as u64,
            buffers_end: HEADER_SIZE as u64,
            objects_checksum: 0,
            buffers_checksum: 0,
            chunks: [Chunk::default(); ChunkKind::COUNT],
        }
    }

    pub fn chunk(&self, kind: ChunkKind) -> &Chunk {
        &self.chunks[kind.index()]
    }

    pub fn chunk_mut(&mut self, kind: ChunkKind) -> &mut Chunk {
        &mut self.chunks[kind.index()]
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        out.extend_from_slice(&self.magic);
        out.extend_from_slice(&self.version.to_ne_bytes());
        out.extend_from_slice(&self.flags.to_ne_bytes());
        out.extend_from_slice(&self.header_crc.to_ne_bytes());
        for value in [
            self.headers_end,
            self.objects_end,
            self.buffers_end,
            self.objects_checksum,
            self.buffers_checksum,
        ] {
            out.extend_from_slice(&value.to_ne_bytes());
        }
        for chunk in &self.chunks {
            out.extend_from_slice(&chunk.offset.to_ne_bytes());
            out.extend_from_slice(&chunk.size.to_ne_bytes());
            out.extend_from_slice(&chunk.count.to_ne_bytes());
            out.extend_from_slice(&chunk.crc32.to_ne_bytes());
        }
        let mut bytes = [0u8; HEADER_SIZE];
        bytes.copy_from_slice(&out);
        bytes
    }

    /// Parse the fixed fields. Performs no validation beyond length.
    pub fn from_bytes(bytes: &[u8]) -> TableResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(TableError::HeaderTooShort {
                actual: bytes.len(),
                required: HEADER_SIZE,
            });
        }
        let mut r = ByteReader::new(&bytes[..HEADER_SIZE]);
        let mut magic = [0u8; 4];
        magic.copy_from_slice(r.read_bytes(4)?);
        let mut header = Self {
            magic,
            version: r.read_u32()?,
            flags: r.read_u32()?,
            header_crc: r.read_u32()?,
            headers_end: r.read_u64()?,
            objects_end: r.read_u64()?,
            buffers_end: r.read_u64()?,
            objects_checksum: r.read_u64()?,
            buffers_checksum: r.read_u64()?,
            chunks: [Chunk::default(); ChunkKind::COUNT],
        };
        for chunk in header.chunks.iter_mut() {
            *chunk = Chunk {
                offset: r.read_u64()?,
                size: r.read_u64()?,
                count: r.read_u32()?,
                crc32: r.read_u32()?,
            };
        }
        Ok(header)
    }

    /// crc32 of the serialized header with the crc field set to the sentinel.
    pub fn computed_crc(&self) -> u32 {
        let mut probe = self.clone();
        probe.header_crc = CRC_SENTINEL;
        crc32(&probe.to_bytes())
    }

    /// Store the checksum of the current field values.
    pub fn seal(&mut self) {
        self.header_crc = self.computed_crc();
    }

    pub fn is_sealed(&self) -> bool {
        self.header_crc == self.computed_crc()
    }

    /// Overwrite the header at `base`, then restore the sink position.
    pub fn patch(&self, sink: &mut dyn ContainerSink, base: u64) -> StoreResult<()> {
        let resume = sink.pos();
        sink.seek(base)?;
        sink.write_all(&self.to_bytes())?;
        sink.seek(resume)
    }
}
