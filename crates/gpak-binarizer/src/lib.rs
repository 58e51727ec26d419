//! Container writer for GPAK.
//!
//! An object body starts as a vector of symbolic [`Opcode`]s. Saving runs in
//! three steps:
//!
//! 1. **Layout**: every body is laid out in two passes ([`layout`]), which
//!    interns its symbols and fixes its skip widths.
//! 2. **Placement**: export and buffer records are computed from the final
//!    body sizes, so the tables can be written before any body.
//! 3. **Emit**: tables, then bodies, then buffer payloads are streamed to a
//!    `ContainerSink`; the header is patched with both region checksums.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut body = OpcodeStream::new();
//! body.property("Vector3", "x", "float").block(&1.0f32.to_ne_bytes());
//! let objects = vec![SaveObject::new("Vector3", body.finish()?)];
//! let report = Binarizer::default().save(TableBuilder::new(), &objects, &mut sink)?;
//! ```

pub mod error;
pub mod layout;
pub mod opcode;
pub mod packer;
pub mod writer;

pub use error::{BinarizeError, BinarizeResult, InvariantViolation};
pub use layout::{lay_out, LaidOutBody, ObjectLayout, SkipLayout};
pub use opcode::{BufferRef, ObjectHandle, Opcode, OpcodeStream, PendingBuffer, SkipId};
pub use packer::{Binarizer, BinarizerConfig, ObjectBody, SaveObject, SaveReport};
pub use writer::{ChecksumWriter, RegionSummary, WRITE_BLOCK};

#[cfg(test)]
mod tests {
    use super::*;
    use gpak_codec::{crc32, RollingChecksum};
    use gpak_store::{ContainerSink, FileSink, MemorySink, StoreError};
    use gpak_tables::{
        flags, validate_tables, BufferEntry, TableBuilder, TableError, ValidationConfig,
    };
    use gpak_types::{CompressionType, Guid, ResourceKey};

    fn vector3(x: f32, y: f32, z: f32) -> Vec<Opcode> {
        let mut s = OpcodeStream::new();
        for (name, value) in [("x", x), ("y", y), ("z", z)] {
            s.property("Vector3", name, "float")
                .block(&value.to_ne_bytes());
        }
        s.finish().unwrap()
    }

    fn region_checksum(bytes: &[u8]) -> u64 {
        let mut rolling = RollingChecksum::REGION;
        rolling.update(bytes);
        rolling.finish()
    }

    #[test]
    fn saved_container_validates() {
        let mut sink = MemorySink::new();
        let objects = vec![
            SaveObject::new("Vector3", vector3(1.0, 2.0, 3.0)),
            SaveObject::new("Vector3", vector3(4.0, 5.0, 6.0)),
        ];
        let report = Binarizer::default()
            .save(TableBuilder::new(), &objects, &mut sink)
            .unwrap();
        let bytes = sink.into_inner();
        assert_eq!(report.bytes_written, bytes.len() as u64);
        assert_eq!(report.header.buffers_end, bytes.len() as u64);

        let tables = validate_tables(&bytes, &ValidationConfig::default()).unwrap();
        let header = tables.header();
        assert_eq!(header, &report.header);
        assert!(!header.has_flag(flags::HAS_BUFFERS));
        assert_eq!(tables.exports().len(), 2);
        assert_eq!(tables.properties().len(), 4);

        let first = tables.exports()[0];
        let second = tables.exports()[1];
        assert_eq!(first.data_offset, header.headers_end);
        assert_eq!(second.data_offset, first.data_offset + first.data_size);
        assert_eq!(second.data_offset + second.data_size, header.objects_end);
        let body = &bytes[first.data_offset as usize..(first.data_offset + first.data_size) as usize];
        assert_eq!(crc32(body), first.checksum);
        assert_eq!(tables.type_name(first.class_type).unwrap(), "Vector3");

        let objects_region = &bytes[header.headers_end as usize..header.objects_end as usize];
        assert_eq!(region_checksum(objects_region), header.objects_checksum);
        assert_eq!(region_checksum(&[]), header.buffers_checksum);
    }

    #[test]
    fn deferred_buffers_are_deduplicated_and_placed() {
        let payload = vec![0x5Au8; 3000];
        let binarizer = Binarizer::new(BinarizerConfig {
            compression: CompressionType::Zstd,
        });
        let buffer = binarizer.deferred_buffer(&payload).unwrap();
        let other = PendingBuffer::uncompressed(b"second payload").unwrap();

        let mut a = OpcodeStream::new();
        a.property("Mesh", "vertices", "buffer")
            .deferred_buffer(buffer.clone());
        let mut b = OpcodeStream::new();
        b.property("Mesh", "vertices", "buffer")
            .deferred_buffer(buffer.clone())
            .deferred_buffer(other.clone());
        let objects = vec![
            SaveObject::new("Mesh", a.finish().unwrap()),
            SaveObject::new("Mesh", b.finish().unwrap()),
        ];

        let mut sink = MemorySink::new();
        let report = binarizer
            .save(TableBuilder::new(), &objects, &mut sink)
            .unwrap();
        let bytes = sink.into_inner();
        let tables = validate_tables(&bytes, &ValidationConfig::default()).unwrap();

        assert!(report.header.has_flag(flags::HAS_BUFFERS));
        assert_eq!(tables.buffers().len(), 2);
        let info = tables.find_buffer(buffer.checksum).unwrap();
        assert_eq!(info.file_offset, report.header.objects_end);
        assert_eq!(info.compression, CompressionType::Zstd);
        assert_eq!(info.uncompressed_size, 3000);
        let stored = &bytes[info.file_offset as usize..][..info.compressed_size as usize];
        assert_eq!(stored, buffer.stored.as_slice());

        let second = tables.find_buffer(other.checksum).unwrap();
        assert_eq!(
            second.file_offset,
            info.file_offset + u64::from(info.compressed_size)
        );
        let buffers_region =
            &bytes[report.header.objects_end as usize..report.header.buffers_end as usize];
        assert_eq!(region_checksum(buffers_region), report.header.buffers_checksum);
    }

    #[test]
    fn pointers_and_imports_resolve_to_tables() {
        let texture = ResourceKey::new("Texture", Guid::from_words([1, 2, 3, 4]));
        let mut root = OpcodeStream::new();
        root.property("Material", "albedo", "Texture")
            .resource(texture.clone())
            .property("Material", "next", "Material")
            .object(Some(ObjectHandle(1)));
        let mut leaf = OpcodeStream::new();
        leaf.property("Material", "next", "Material").object(None);
        let objects = vec![
            SaveObject::new("Material", root.finish().unwrap()),
            SaveObject::new("Material", leaf.finish().unwrap()),
        ];

        let mut sink = MemorySink::new();
        Binarizer::default()
            .save(TableBuilder::new(), &objects, &mut sink)
            .unwrap();
        let tables = validate_tables(sink.as_bytes(), &ValidationConfig::default()).unwrap();
        let deps = tables.dependencies().unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].to_key(), texture);
    }

    #[test]
    fn container_at_nonzero_offset() {
        let mut sink = MemorySink::new();
        sink.write_all(b"preamble").unwrap();
        let objects = vec![SaveObject::new("Vector3", vector3(0.0, 0.0, 1.0))];
        let report = Binarizer::default()
            .save(TableBuilder::new(), &objects, &mut sink)
            .unwrap();
        let bytes = sink.into_inner();
        assert_eq!(&bytes[..8], b"preamble");
        assert_eq!(report.bytes_written as usize, bytes.len() - 8);
        validate_tables(&bytes[8..], &ValidationConfig::default()).unwrap();
    }

    #[test]
    fn short_write_fails_the_save() {
        let objects = vec![SaveObject::new("Vector3", vector3(1.0, 1.0, 1.0))];
        let mut probe = MemorySink::new();
        let full = Binarizer::default()
            .save(TableBuilder::new(), &objects, &mut probe)
            .unwrap()
            .bytes_written as usize;

        let mut sink = MemorySink::with_limit(full - 4);
        let err = Binarizer::default()
            .save(TableBuilder::new(), &objects, &mut sink)
            .unwrap_err();
        assert!(matches!(
            err,
            BinarizeError::Store(StoreError::ShortWrite { .. })
        ));

        let mut tiny = MemorySink::with_limit(16);
        let err = Binarizer::default()
            .save(TableBuilder::new(), &objects, &mut tiny)
            .unwrap_err();
        assert!(matches!(
            err,
            BinarizeError::Table(TableError::Store(StoreError::ShortWrite { .. }))
        ));
    }

    #[test]
    fn builder_with_records_is_refused() {
        let mut tables = TableBuilder::new();
        tables
            .push_buffer(BufferEntry {
                checksum: 1,
                file_offset: 0,
                compressed_size: 0,
                uncompressed_size: 0,
                compression: CompressionType::None,
            })
            .unwrap();
        let mut sink = MemorySink::new();
        assert!(matches!(
            Binarizer::default().save(tables, &[], &mut sink),
            Err(BinarizeError::BuilderNotEmpty { buffers: 1, .. })
        ));
    }

    #[test]
    fn save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.gpak");
        let objects = vec![SaveObject::new("Vector3", vector3(7.0, 8.0, 9.0))];
        let mut sink = FileSink::create(&path).unwrap();
        let report = Binarizer::default()
            .save(TableBuilder::new(), &objects, &mut sink)
            .unwrap();
        sink.sync().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len() as u64, report.bytes_written);
        validate_tables(&bytes, &ValidationConfig::default()).unwrap();
    }
}
