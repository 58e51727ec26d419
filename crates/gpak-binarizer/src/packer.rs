use std::collections::HashSet;
use std::sync::Arc;

use gpak_codec::{crc32, BufferCodec, StandardCodec};
use gpak_store::ContainerSink;
use gpak_tables::{BufferEntry, ExportEntry, Header, RegionLayout, TableBuilder};
use gpak_types::CompressionType;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{BinarizeError, BinarizeResult};
use crate::layout::{lay_out, ObjectLayout};
use crate::opcode::{size_u32, Opcode, PendingBuffer};
use crate::writer::ChecksumWriter;

/// Binarizer settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarizerConfig {
    /// Compression applied by [`Binarizer::deferred_buffer`].
    pub compression: CompressionType,
}

/// Body of an object to save.
#[derive(Clone, Debug)]
pub enum ObjectBody {
    /// Symbolic opcodes, laid out and interned during the save.
    Opcodes(Vec<Opcode>),
    /// A body that is already positional, copied verbatim.
    ///
    /// Its indices must be valid for the builder's tables, which holds when
    /// the builder was seeded from the container the body came from. Deferred
    /// buffers the body references travel alongside.
    Encoded {
        bytes: Vec<u8>,
        buffers: Vec<PendingBuffer>,
    },
}

/// One object to save. Its position in the slice is its export index.
#[derive(Clone, Debug)]
pub struct SaveObject {
    pub class: String,
    pub flags: u32,
    pub body: ObjectBody,
}

impl SaveObject {
    pub fn new(class: &str, ops: Vec<Opcode>) -> Self {
        Self {
            class: class.to_owned(),
            flags: 0,
            body: ObjectBody::Opcodes(ops),
        }
    }
}

/// Outcome of a successful save.
#[derive(Clone, Debug, Serialize)]
pub struct SaveReport {
    pub header: Header,
    pub objects: Vec<ObjectLayout>,
    /// Skip padding summed over every body.
    pub wasted_bytes: u64,
    pub bytes_written: u64,
}

/// Writes object graphs into containers.
#[derive(Clone)]
pub struct Binarizer {
    config: BinarizerConfig,
    codec: Arc<dyn BufferCodec>,
}

impl Default for Binarizer {
    fn default() -> Self {
        Self::new(BinarizerConfig::default())
    }
}

impl Binarizer {
    pub fn new(config: BinarizerConfig) -> Self {
        Self {
            config,
            codec: Arc::new(StandardCodec::default()),
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn BufferCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &BinarizerConfig {
        &self.config
    }

    /// A deferred buffer compressed with the configured compression.
    pub fn deferred_buffer(&self, data: &[u8]) -> BinarizeResult<PendingBuffer> {
        PendingBuffer::compress(data, self.config.compression, self.codec.as_ref())
    }

    /// Save `objects` at the sink's current position.
    ///
    /// `tables` may be fresh or seeded from an existing container, but must
    /// not hold export or buffer records yet. It is consumed: the tables are
    /// write-once per save.
    pub fn save(
        &self,
        mut tables: TableBuilder,
        objects: &[SaveObject],
        sink: &mut dyn ContainerSink,
    ) -> BinarizeResult<SaveReport> {
        if !tables.exports().is_empty() || !tables.buffers().is_empty() {
            return Err(BinarizeError::BuilderNotEmpty {
                exports: tables.exports().len(),
                buffers: tables.buffers().len(),
            });
        }
        let base = sink.pos();

        // Layout interns every symbol; the tables are final afterwards.
        let mut bodies = Vec::with_capacity(objects.len());
        let mut layouts = Vec::with_capacity(objects.len());
        let mut pending: Vec<&PendingBuffer> = Vec::new();
        let mut seen = HashSet::new();
        for object in objects {
            let class_type = tables.map_type(&object.class)?;
            match &object.body {
                ObjectBody::Opcodes(ops) => {
                    let body = lay_out(class_type, ops, &mut tables, objects.len())?;
                    for buffer in body.deferred_buffers() {
                        if seen.insert(buffer.checksum) {
                            pending.push(buffer);
                        }
                    }
                    bodies.push(body.emit()?);
                    layouts.push(body.into_layout());
                }
                ObjectBody::Encoded { bytes, buffers } => {
                    for buffer in buffers {
                        if seen.insert(buffer.checksum) {
                            pending.push(buffer);
                        }
                    }
                    bodies.push(bytes.clone());
                    layouts.push(ObjectLayout {
                        class_type,
                        size: bytes.len(),
                        ..ObjectLayout::default()
                    });
                }
            }
        }

        let headers_end = tables.encoded_len_with(objects.len(), pending.len());
        let mut offset = headers_end;
        for ((object, body), layout) in objects.iter().zip(&bodies).zip(&layouts) {
            tables.push_export(ExportEntry {
                class_type: layout.class_type,
                checksum: crc32(body),
                flags: object.flags,
                data_offset: offset,
                data_size: body.len() as u64,
            })?;
            offset += body.len() as u64;
        }
        let objects_end = offset;
        for buffer in &pending {
            tables.push_buffer(BufferEntry::from(buffer.info_at(offset)?))?;
            offset += u64::from(size_u32("compressed buffer", buffer.stored.len())?);
        }
        let buffers_end = offset;

        let mut header = tables.write(
            sink,
            RegionLayout {
                objects_end,
                buffers_end,
            },
        )?;
        debug_assert_eq!(header.headers_end, headers_end);

        let mut writer = ChecksumWriter::new(&mut *sink);
        for body in &bodies {
            writer.write(body)?;
        }
        let object_region = writer.finish()?;

        let mut writer = ChecksumWriter::new(&mut *sink);
        for buffer in &pending {
            writer.write(&buffer.stored)?;
        }
        let buffer_region = writer.finish()?;

        header.objects_checksum = object_region.checksum;
        header.buffers_checksum = buffer_region.checksum;
        header.seal();
        header.patch(sink, base)?;

        let wasted_bytes = layouts.iter().map(|l| l.wasted as u64).sum();
        let bytes_written = sink.pos() - base;
        debug!(
            headers_end,
            objects_end,
            buffers_end,
            wasted_bytes,
            "container regions written"
        );
        info!(
            objects = objects.len(),
            buffers = pending.len(),
            bytes = bytes_written,
            "container saved"
        );

        Ok(SaveReport {
            header,
            objects: layouts,
            wasted_bytes,
            bytes_written,
        })
    }
}
