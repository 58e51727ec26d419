//! Fixed-size table records.
//!
//! Every record is a flat run of native-endian integers. Sizes never change
//! within a format version; readers reject chunks whose byte size is not
//! `count * SIZE`.

use gpak_codec::{ByteReader, CodecResult};
use gpak_types::{
    BufferInfo, CompressionType, Guid, NameIndex, StringIndex, TypeIndex,
};
use serde::Serialize;

/// A fixed-size record stored in one of the table chunks.
pub trait Record: Sized {
    const SIZE: usize;

    fn write_to(&self, out: &mut Vec<u8>);

    fn read_from(r: &mut ByteReader<'_>) -> CodecResult<Self>;
}

/// Serialize a slice of records into a chunk body.
pub fn encode_records<R: Record>(records: &[R]) -> Vec<u8> {
    let mut out = Vec::with_capacity(records.len() * R::SIZE);
    for record in records {
        record.write_to(&mut out);
    }
    out
}

/// Parse `count` records from a chunk body.
pub fn decode_records<R: Record>(bytes: &[u8], count: u32) -> CodecResult<Vec<R>> {
    let mut r = ByteReader::new(bytes);
    (0..count).map(|_| R::read_from(&mut r)).collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct NameEntry {
    pub string: StringIndex,
}

impl Record for NameEntry {
    const SIZE: usize = 4;

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.string.get().to_ne_bytes());
    }

    fn read_from(r: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            string: StringIndex::new(r.read_u32()?),
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct TypeEntry {
    pub name: NameIndex,
}

impl Record for TypeEntry {
    const SIZE: usize = 4;

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.name.get().to_ne_bytes());
    }

    fn read_from(r: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            name: NameIndex::new(r.read_u32()?),
        })
    }
}

/// A property of a class type, keyed by `(class_type, name)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PropertyEntry {
    pub class_type: TypeIndex,
    pub value_type: TypeIndex,
    pub name: NameIndex,
}

impl Record for PropertyEntry {
    const SIZE: usize = 12;

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.class_type.get().to_ne_bytes());
        out.extend_from_slice(&self.value_type.get().to_ne_bytes());
        out.extend_from_slice(&self.name.get().to_ne_bytes());
    }

    fn read_from(r: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            class_type: TypeIndex::new(r.read_u32()?),
            value_type: TypeIndex::new(r.read_u32()?),
            name: NameIndex::new(r.read_u32()?),
        })
    }
}

/// An external resource this container depends on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ImportEntry {
    pub class_type: TypeIndex,
    pub guid: Guid,
}

impl Record for ImportEntry {
    const SIZE: usize = 20;

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.class_type.get().to_ne_bytes());
        for word in self.guid.words() {
            out.extend_from_slice(&word.to_ne_bytes());
        }
    }

    fn read_from(r: &mut ByteReader<'_>) -> CodecResult<Self> {
        let class_type = TypeIndex::new(r.read_u32()?);
        let mut words = [0u32; 4];
        for word in words.iter_mut() {
            *word = r.read_u32()?;
        }
        Ok(Self {
            class_type,
            guid: Guid::from_words(words),
        })
    }
}

/// One serialized object body in the object region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ExportEntry {
    pub class_type: TypeIndex,
    /// crc32 of the body bytes.
    pub checksum: u32,
    pub flags: u32,
    /// Offset from the start of the container.
    pub data_offset: u64,
    pub data_size: u64,
}

impl Record for ExportEntry {
    const SIZE: usize = 28;

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.class_type.get().to_ne_bytes());
        out.extend_from_slice(&self.checksum.to_ne_bytes());
        out.extend_from_slice(&self.flags.to_ne_bytes());
        out.extend_from_slice(&self.data_offset.to_ne_bytes());
        out.extend_from_slice(&self.data_size.to_ne_bytes());
    }

    fn read_from(r: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            class_type: TypeIndex::new(r.read_u32()?),
            checksum: r.read_u32()?,
            flags: r.read_u32()?,
            data_offset: r.read_u64()?,
            data_size: r.read_u64()?,
        })
    }
}

/// One deferred payload in the buffer region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BufferEntry {
    /// Checksum of the uncompressed payload; unique within a container.
    pub checksum: u64,
    pub file_offset: u64,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub compression: CompressionType,
}

impl BufferEntry {
    pub fn info(&self) -> BufferInfo {
        BufferInfo {
            checksum: self.checksum,
            file_offset: self.file_offset,
            compressed_size: self.compressed_size,
            uncompressed_size: self.uncompressed_size,
            compression: self.compression,
        }
    }

    pub fn stored_end(&self) -> Option<u64> {
        self.file_offset.checked_add(u64::from(self.compressed_size))
    }
}

impl From<BufferInfo> for BufferEntry {
    fn from(info: BufferInfo) -> Self {
        Self {
            checksum: info.checksum,
            file_offset: info.file_offset,
            compressed_size: info.compressed_size,
            uncompressed_size: info.uncompressed_size,
            compression: info.compression,
        }
    }
}

impl Record for BufferEntry {
    const SIZE: usize = 28;

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.checksum.to_ne_bytes());
        out.extend_from_slice(&self.file_offset.to_ne_bytes());
        out.extend_from_slice(&self.compressed_size.to_ne_bytes());
        out.extend_from_slice(&self.uncompressed_size.to_ne_bytes());
        out.push(self.compression.tag());
        out.extend_from_slice(&[0u8; 3]);
    }

    fn read_from(r: &mut ByteReader<'_>) -> CodecResult<Self> {
        let entry = Self {
            checksum: r.read_u64()?,
            file_offset: r.read_u64()?,
            compressed_size: r.read_u32()?,
            uncompressed_size: r.read_u32()?,
            compression: CompressionType::from_tag(r.read_u8()?),
        };
        r.read_bytes(3)?;
        Ok(entry)
    }
}
