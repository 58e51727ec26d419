//! Reader side of GPAK containers.
//!
//! [`Container`] validates the bytes once on open; [`Loader`] then walks each
//! export body, turns table indices back into symbols and hands the result to
//! an [`ObjectConstructor`]. How deep the walk goes is set by
//! [`LoadConfig::mode`]:
//!
//! - `Full`: deferred buffers are fetched through a [`BufferFactory`]
//! - `NoBuffers`: deferred buffers arrive as unfetched [`BufferHandle`]s
//! - `DependenciesOnly`: no bodies are decoded; only imports are listed

pub mod buffers;
pub mod collect;
pub mod config;
pub mod container;
pub mod error;
pub mod loader;
pub mod opcode;
pub mod resave;

pub use buffers::{
    AsyncBufferLoader, BufferFactory, BufferHandle, ContainerBufferFactory, SharedBufferLoader,
};
pub use collect::{GraphCollector, LoadedObject};
pub use config::{CapacityLimits, LoadConfig};
pub use container::Container;
pub use error::{LoadError, LoadResult};
pub use gpak_tables::ValidationConfig;
pub use loader::{LoadReport, Loader, ObjectConstructor, ObjectInfo};
pub use opcode::{BufferPayload, PropertyRef, ResolvedOpcode};

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::sync::Arc;

    use super::*;
    use gpak_binarizer::{
        Binarizer, BinarizerConfig, ObjectBody, ObjectHandle, OpcodeStream, PendingBuffer,
        SaveObject,
    };
    use gpak_codec::checksum64;
    use gpak_store::{FileSink, MemorySink};
    use gpak_tables::{ChunkKind, Header, TableBuilder, TableError};
    use gpak_types::{CompressionType, ExportIndex, Guid, LoadMode, ResourceKey};

    fn save(objects: &[SaveObject]) -> Vec<u8> {
        save_with(TableBuilder::new(), objects)
    }

    fn save_with(tables: TableBuilder, objects: &[SaveObject]) -> Vec<u8> {
        let mut sink = MemorySink::new();
        Binarizer::default().save(tables, objects, &mut sink).unwrap();
        sink.into_inner()
    }

    fn vector3(x: f32, y: f32, z: f32) -> SaveObject {
        let mut s = OpcodeStream::new();
        for (name, value) in [("x", x), ("y", y), ("z", z)] {
            s.property("Vector3", name, "float")
                .block(&value.to_ne_bytes());
        }
        SaveObject::new("Vector3", s.finish().unwrap())
    }

    fn load(container: &Container, mode: LoadMode) -> (LoadReport, Vec<LoadedObject>) {
        let mut collector = GraphCollector::new();
        let report = Loader::new(container, LoadConfig::with_mode(mode))
            .load(&mut collector)
            .unwrap();
        (report, collector.into_objects())
    }

    fn float(op: Option<&ResolvedOpcode<'static>>) -> f32 {
        match op {
            Some(ResolvedOpcode::DataBlock { width: 1, bytes }) => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(bytes);
                f32::from_ne_bytes(raw)
            }
            other => panic!("expected a float block, got {other:?}"),
        }
    }

    #[test]
    fn vector3_roundtrip() {
        let bytes = save(&[vector3(1.0, 2.0, 3.0)]);
        let container = Container::from_bytes(bytes, &ValidationConfig::default()).unwrap();
        let (report, objects) = load(&container, LoadMode::Full);

        assert_eq!(report.objects, 1);
        assert_eq!(report.opcodes, 6);
        let object = &objects[0];
        assert_eq!(object.class, "Vector3");
        let names: Vec<_> = object
            .properties()
            .map(|(p, _)| (&*p.class, &*p.name, &*p.value_type))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Vector3", "x", "float"),
                ("Vector3", "y", "float"),
                ("Vector3", "z", "float")
            ]
        );
        assert_eq!(float(object.value("x")), 1.0);
        assert_eq!(float(object.value("y")), 2.0);
        assert_eq!(float(object.value("z")), 3.0);
    }

    #[test]
    fn skip_labels_are_reported_where_regions_end() {
        let mut s = OpcodeStream::new();
        s.property("Node", "children", "array");
        s.begin_skip();
        s.number(2);
        s.begin_skip();
        s.block(&[0xAA; 300]).end_skip();
        s.name("tail").end_skip();
        s.number(-1);
        let bytes = save(&[SaveObject::new("Node", s.finish().unwrap())]);
        let container = Container::from_bytes(bytes, &ValidationConfig::default()).unwrap();
        let (_, objects) = load(&container, LoadMode::Full);

        let kinds: Vec<&str> = objects[0]
            .opcodes
            .iter()
            .map(|op| match op {
                ResolvedOpcode::SkipHeader { .. } => "header",
                ResolvedOpcode::SkipLabel => "label",
                ResolvedOpcode::Property(_) => "property",
                ResolvedOpcode::DataBlock { .. } => "block",
                ResolvedOpcode::DataName(_) => "name",
                ResolvedOpcode::DataAdaptiveNumber(_) => "number",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "property", "header", "number", "header", "block", "label", "name", "label",
                "number"
            ]
        );
        assert_eq!(
            objects[0].opcodes.last(),
            Some(&ResolvedOpcode::DataAdaptiveNumber(-1))
        );
    }

    #[test]
    fn pointers_and_resources_resolve() {
        let texture = ResourceKey::new("Texture", Guid::from_words([5, 6, 7, 8]));
        let mut root = OpcodeStream::new();
        root.property("Material", "albedo", "Texture")
            .resource(texture.clone())
            .property("Material", "next", "Material")
            .object(Some(ObjectHandle(1)))
            .type_ref("Shader")
            .resource(ResourceKey::null());
        let mut leaf = OpcodeStream::new();
        leaf.property("Material", "next", "Material").object(None);
        let bytes = save(&[
            SaveObject::new("Material", root.finish().unwrap()),
            SaveObject::new("Material", leaf.finish().unwrap()),
        ]);
        let container = Container::from_bytes(bytes, &ValidationConfig::default()).unwrap();
        let (_, objects) = load(&container, LoadMode::Full);

        let root = &objects[0];
        assert_eq!(
            root.value("albedo"),
            Some(&ResolvedOpcode::DataResourceRef(Some(texture)))
        );
        assert_eq!(
            root.value("next"),
            Some(&ResolvedOpcode::DataObjectPointer(Some(ExportIndex::new(1))))
        );
        assert_eq!(
            root.opcodes[4],
            ResolvedOpcode::DataTypeRef(Cow::Borrowed("Shader"))
        );
        assert_eq!(root.opcodes[5], ResolvedOpcode::DataResourceRef(None));
        assert_eq!(
            objects[1].value("next"),
            Some(&ResolvedOpcode::DataObjectPointer(None))
        );
    }

    #[test]
    fn deferred_buffer_stays_unfetched_without_buffers() {
        let stored: Vec<u8> = (0..100u8).collect();
        let checksum = 0x0123_4567_89AB_CDEF;
        let buffer = PendingBuffer::from_stored(checksum, 400, CompressionType::Zstd, stored.clone());
        let mut s = OpcodeStream::new();
        s.property("Mesh", "vertices", "buffer")
            .deferred_buffer(buffer);
        let bytes = save(&[SaveObject::new("Mesh", s.finish().unwrap())]);
        let container = Container::from_bytes(bytes, &ValidationConfig::default()).unwrap();
        let (report, objects) = load(&container, LoadMode::NoBuffers);

        assert_eq!(report.buffers_fetched, 0);
        assert_eq!(report.buffers_deferred, 1);
        let handle = match objects[0].value("vertices") {
            Some(ResolvedOpcode::DataDeferredBuffer(BufferPayload::Deferred(handle))) => *handle,
            other => panic!("expected a deferred handle, got {other:?}"),
        };
        let info = handle.info();
        assert_eq!(info.checksum, checksum);
        assert_eq!(info.compressed_size, 100);
        assert_eq!(info.uncompressed_size, 400);
        assert_eq!(info.compression, CompressionType::Zstd);
        assert_eq!(info.file_offset, container.header().objects_end);
        assert_eq!(handle.fetch_raw(&container).unwrap(), stored);
    }

    #[test]
    fn full_mode_fetches_and_verifies_buffers() {
        let payload: Vec<u8> = (0..8192u32).map(|i| (i % 17) as u8).collect();
        let binarizer = Binarizer::new(BinarizerConfig {
            compression: CompressionType::Zstd,
        });
        let buffer = binarizer.deferred_buffer(&payload).unwrap();
        let mut s = OpcodeStream::new();
        s.property("Mesh", "vertices", "buffer")
            .deferred_buffer(buffer);
        let mut sink = MemorySink::new();
        binarizer
            .save(
                TableBuilder::new(),
                &[SaveObject::new("Mesh", s.finish().unwrap())],
                &mut sink,
            )
            .unwrap();
        let container =
            Container::from_bytes(sink.into_inner(), &ValidationConfig::default()).unwrap();
        let (report, objects) = load(&container, LoadMode::Full);

        assert_eq!(report.buffers_fetched, 1);
        assert_eq!(
            objects[0].value("vertices"),
            Some(&ResolvedOpcode::DataDeferredBuffer(BufferPayload::Loaded(
                payload.clone()
            )))
        );
        let info = container.tables().find_buffer(checksum64(&payload)).unwrap();
        assert!(info.compressed_size < info.uncompressed_size);
    }

    #[test]
    fn dependencies_only_skips_bodies() {
        let texture = ResourceKey::new("Texture", Guid::from_words([1, 0, 0, 0]));
        let mesh = ResourceKey::new("Mesh", Guid::from_words([2, 0, 0, 0]));
        let mut s = OpcodeStream::new();
        s.property("Model", "texture", "Texture")
            .resource(texture.clone())
            .property("Model", "mesh", "Mesh")
            .resource(mesh.clone());
        let bytes = save(&[SaveObject::new("Model", s.finish().unwrap())]);
        let container = Container::from_bytes(bytes, &ValidationConfig::default()).unwrap();
        let (report, objects) = load(&container, LoadMode::DependenciesOnly);

        assert!(objects.is_empty());
        assert_eq!(report.objects, 0);
        assert_eq!(report.dependencies, vec![texture, mesh]);
    }

    #[test]
    fn corrupt_chunk_is_rejected_by_name() {
        let mut bytes = save(&[vector3(1.0, 2.0, 3.0)]);
        let header = Header::from_bytes(&bytes).unwrap();
        let names = header.chunk(ChunkKind::Names);
        bytes[names.offset as usize + 4] ^= 0x40;

        let err = Container::from_bytes(bytes, &ValidationConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Table(TableError::ChunkChecksumMismatch {
                chunk: ChunkKind::Names,
                ..
            })
        ));
    }

    #[test]
    fn corrupt_body_is_rejected_unless_verification_is_off() {
        let mut bytes = save(&[vector3(1.0, 2.0, 3.0)]);
        let header = Header::from_bytes(&bytes).unwrap();
        // Last byte of the z value.
        bytes[header.objects_end as usize - 1] ^= 0xFF;

        let err = Container::from_bytes(bytes.clone(), &ValidationConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::RegionChecksumMismatch {
                region: "objects",
                ..
            }
        ));

        let container = Container::from_bytes(bytes, &ValidationConfig::release()).unwrap();
        let (_, objects) = load(&container, LoadMode::Full);
        assert_ne!(float(objects[0].value("z")), 3.0);
    }

    #[test]
    fn unknown_buffer_checksum_fails_the_load() {
        let mut body = vec![0x0B, 0x01];
        body.extend_from_slice(&42u64.to_ne_bytes());
        let object = SaveObject {
            class: "Blob".to_owned(),
            flags: 0,
            body: ObjectBody::Encoded {
                bytes: body,
                buffers: Vec::new(),
            },
        };
        let container =
            Container::from_bytes(save(&[object]), &ValidationConfig::default()).unwrap();
        let mut collector = GraphCollector::new();
        let err = Loader::new(&container, LoadConfig::default())
            .load(&mut collector)
            .unwrap_err();
        assert!(matches!(err, LoadError::UnknownBuffer { checksum: 42 }));
    }

    #[test]
    fn malformed_bodies_are_reported() {
        let cases: [(&[u8], &str); 3] = [
            (&[0x7F], "unknown"),
            (&[0x03, 0x09, 1, 2], "truncated"),
            (&[0x01, 0x10, 0x0A, 0x00], "skip"),
        ];
        for (body, label) in cases {
            let object = SaveObject {
                class: "Blob".to_owned(),
                flags: 0,
                body: ObjectBody::Encoded {
                    bytes: body.to_vec(),
                    buffers: Vec::new(),
                },
            };
            let container =
                Container::from_bytes(save(&[object]), &ValidationConfig::default()).unwrap();
            let err = Loader::new(&container, LoadConfig::default())
                .load(&mut GraphCollector::new())
                .unwrap_err();
            match label {
                "unknown" => assert!(matches!(err, LoadError::UnknownOpcode { tag: 0x7F, .. })),
                _ => assert!(
                    matches!(err, LoadError::MalformedBody { .. }),
                    "{label}: {err}"
                ),
            }
        }
    }

    #[test]
    fn capacity_limits_are_checked_before_reading() {
        let mut s = OpcodeStream::new();
        s.block(&[0u8; 1000]);
        let bytes = save(&[SaveObject::new("Blob", s.finish().unwrap())]);
        let container = Container::from_bytes(bytes, &ValidationConfig::default()).unwrap();
        let mut config = LoadConfig::default();
        config.limits.max_block_len = 512;
        let err = Loader::new(&container, config)
            .load(&mut GraphCollector::new())
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Capacity {
                what: "data block",
                len: 1000,
                max: 512
            }
        ));
    }

    #[test]
    fn seeded_tables_copy_encoded_bodies() {
        let original = save(&[vector3(1.0, 2.0, 3.0)]);
        let container =
            Container::from_bytes(original, &ValidationConfig::default()).unwrap();
        let body = container.body(ExportIndex::new(0)).unwrap().to_vec();

        let tables = TableBuilder::from_tables(container.tables()).unwrap();
        let copied = SaveObject {
            class: "Vector3".to_owned(),
            flags: 0,
            body: ObjectBody::Encoded {
                bytes: body,
                buffers: Vec::new(),
            },
        };
        let patched = save_with(tables, &[copied, vector3(4.0, 5.0, 6.0)]);
        let container = Container::from_bytes(patched, &ValidationConfig::default()).unwrap();
        assert!(container
            .header()
            .has_flag(gpak_tables::flags::INCREMENTAL));
        let (_, objects) = load(&container, LoadMode::Full);
        assert_eq!(float(objects[0].value("x")), 1.0);
        assert_eq!(float(objects[1].value("z")), 6.0);
        assert_eq!(container.tables().properties().len(), 4);
    }

    fn mesh(binarizer: &Binarizer, vertices: &[u8]) -> SaveObject {
        let mut s = OpcodeStream::new();
        s.property("Mesh", "vertices", "buffer")
            .deferred_buffer(binarizer.deferred_buffer(vertices).unwrap());
        SaveObject::new("Mesh", s.finish().unwrap())
    }

    #[test]
    fn resave_carries_deferred_buffers() {
        let binarizer = Binarizer::new(BinarizerConfig {
            compression: CompressionType::Zstd,
        });
        let vertices: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let mut sink = MemorySink::new();
        binarizer
            .save(
                TableBuilder::new(),
                &[mesh(&binarizer, &vertices), vector3(1.0, 2.0, 3.0)],
                &mut sink,
            )
            .unwrap();
        let container =
            Container::from_bytes(sink.into_inner(), &ValidationConfig::default()).unwrap();

        let mut objects = container.encoded_objects().unwrap();
        assert_eq!(objects.len(), 2);
        match &objects[0].body {
            ObjectBody::Encoded { bytes, buffers } => {
                assert_eq!(bytes.as_slice(), container.body(ExportIndex::new(0)).unwrap());
                assert_eq!(buffers.len(), 1);
                assert_eq!(buffers[0].compression, CompressionType::Zstd);
                assert_eq!(buffers[0].checksum, checksum64(&vertices));
            }
            other => panic!("expected encoded body, got {other:?}"),
        }
        assert!(matches!(
            &objects[1].body,
            ObjectBody::Encoded { buffers, .. } if buffers.is_empty()
        ));

        objects.push(vector3(4.0, 5.0, 6.0));
        let tables = TableBuilder::from_tables(container.tables()).unwrap();
        let resaved = save_with(tables, &objects);
        let container = Container::from_bytes(resaved, &ValidationConfig::default()).unwrap();
        assert_eq!(container.tables().buffers().len(), 1);

        let (report, objects) = load(&container, LoadMode::Full);
        assert_eq!(report.buffers_fetched, 1);
        assert_eq!(objects[0].class, "Mesh");
        match objects[0].value("vertices") {
            Some(ResolvedOpcode::DataDeferredBuffer(BufferPayload::Loaded(bytes))) => {
                assert_eq!(bytes, &vertices)
            }
            other => panic!("expected loaded buffer, got {other:?}"),
        }
        assert_eq!(float(objects[1].value("y")), 2.0);
        assert_eq!(float(objects[2].value("z")), 6.0);
    }

    #[test]
    fn buffer_over_limit_fails_full_load() {
        let plain = Binarizer::default();
        let bytes = save(&[mesh(&plain, &[3u8; 20_000])]);
        let container = Container::from_bytes(bytes, &ValidationConfig::default()).unwrap();
        let mut config = LoadConfig::default();
        config.limits.max_buffer_len = 1000;
        let err = Loader::new(&container, config)
            .load(&mut GraphCollector::new())
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Capacity {
                what: "stored buffer",
                len: 20_000,
                max: 1000
            }
        ));

        // Compressed well under the limit, but expands past it.
        let zstd = Binarizer::new(BinarizerConfig {
            compression: CompressionType::Zstd,
        });
        let mut sink = MemorySink::new();
        zstd.save(TableBuilder::new(), &[mesh(&zstd, &[3u8; 20_000])], &mut sink)
            .unwrap();
        let container =
            Container::from_bytes(sink.into_inner(), &ValidationConfig::default()).unwrap();
        let info = container.tables().buffers()[0].info();
        let err = ContainerBufferFactory::new(&container)
            .with_limits(config.limits)
            .fetch(&info)
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Capacity {
                what: "buffer",
                len: 20_000,
                max: 1000
            }
        ));

        // Deferred handles are not fetched, so the limit does not apply.
        config.mode = LoadMode::NoBuffers;
        let report = Loader::new(&container, config)
            .load(&mut GraphCollector::new())
            .unwrap();
        assert_eq!(report.buffers_deferred, 1);
    }

    #[test]
    fn mapped_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.gpak");
        let mut sink = FileSink::create(&path).unwrap();
        Binarizer::default()
            .save(TableBuilder::new(), &[vector3(7.0, 8.0, 9.0)], &mut sink)
            .unwrap();
        sink.sync().unwrap();

        let container = Container::open(&path, &ValidationConfig::default()).unwrap();
        assert!(container.is_mapped());
        let (_, objects) = load(&container, LoadMode::Full);
        assert_eq!(float(objects[0].value("y")), 8.0);
    }

    #[tokio::test]
    async fn shared_loader_fetches_concurrently() {
        let binarizer = Binarizer::new(BinarizerConfig {
            compression: CompressionType::Zstd,
        });
        let first = vec![1u8; 5000];
        let second = vec![2u8; 7000];
        let mut s = OpcodeStream::new();
        s.deferred_buffer(binarizer.deferred_buffer(&first).unwrap())
            .deferred_buffer(binarizer.deferred_buffer(&second).unwrap());
        let mut sink = MemorySink::new();
        binarizer
            .save(
                TableBuilder::new(),
                &[SaveObject::new("Pair", s.finish().unwrap())],
                &mut sink,
            )
            .unwrap();
        let container = Arc::new(
            Container::from_bytes(sink.into_inner(), &ValidationConfig::default()).unwrap(),
        );

        let mut collector = GraphCollector::new();
        Loader::new(&container, LoadConfig::with_mode(LoadMode::NoBuffers))
            .load(&mut collector)
            .unwrap();
        let handles: Vec<BufferHandle> = collector.objects()[0]
            .opcodes
            .iter()
            .filter_map(|op| match op {
                ResolvedOpcode::DataDeferredBuffer(BufferPayload::Deferred(h)) => Some(*h),
                _ => None,
            })
            .collect();
        assert_eq!(handles.len(), 2);

        let loader = SharedBufferLoader::new(Arc::clone(&container));
        let (a, b) = tokio::join!(
            handles[0].fetch_async(&loader),
            handles[1].fetch_async(&loader)
        );
        assert_eq!(a.unwrap(), first);
        assert_eq!(b.unwrap(), second);
    }
}
