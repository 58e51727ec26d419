//! Structural validation of container bytes.
//!
//! Checks run in a fixed order and stop at the first failure:
//! header length, magic, version range, header checksum, region and chunk
//! bounds, chunk checksums (optional), record layout, reserved entries, and
//! finally every cross-table index.

use std::collections::HashSet;

use gpak_codec::crc32;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TableError, TableResult};
use crate::header::{ChunkKind, Header, HEADER_SIZE, MAGIC, VERSION_MAX, VERSION_MIN};
use crate::records::{
    decode_records, BufferEntry, ExportEntry, ImportEntry, NameEntry, PropertyEntry, Record,
    TypeEntry,
};
use crate::tables::SymbolTables;
use crate::text;

/// Which integrity checks run when a container is opened.
///
/// Structural checks (bounds, record layout, index ranges) always run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Compare every chunk's crc32 against its header record.
    pub verify_chunk_checksums: bool,
    /// Compare region checksums and export body crc32s.
    pub verify_data_checksums: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            verify_chunk_checksums: true,
            verify_data_checksums: true,
        }
    }
}

impl ValidationConfig {
    /// Checksums off; for trusted inputs where open latency matters.
    pub fn release() -> Self {
        Self {
            verify_chunk_checksums: false,
            verify_data_checksums: false,
        }
    }
}

/// Parse and check the header: length, magic, version and checksum.
pub fn validate_header(bytes: &[u8]) -> TableResult<Header> {
    let header = Header::from_bytes(bytes)?;
    if header.magic != MAGIC {
        return Err(TableError::InvalidMagic {
            expected: MAGIC,
            actual: header.magic,
        });
    }
    if header.version < VERSION_MIN {
        return Err(TableError::DeprecatedVersion {
            version: header.version,
            min: VERSION_MIN,
        });
    }
    if header.version > VERSION_MAX {
        return Err(TableError::UnsupportedVersion {
            version: header.version,
            max: VERSION_MAX,
        });
    }
    let actual = header.computed_crc();
    if actual != header.header_crc {
        return Err(TableError::HeaderChecksumMismatch {
            expected: header.header_crc,
            actual,
        });
    }
    Ok(header)
}

fn check_regions(header: &Header, len: u64) -> TableResult<()> {
    let regions = [
        ("tables", HEADER_SIZE as u64, header.headers_end),
        ("objects", header.headers_end, header.objects_end),
        ("buffers", header.objects_end, header.buffers_end),
    ];
    for (region, start, end) in regions {
        if start > end || end > len {
            return Err(TableError::RegionOutOfBounds {
                region,
                start,
                end,
                limit: len,
            });
        }
    }
    Ok(())
}

fn chunk_bytes<'a>(bytes: &'a [u8], header: &Header, kind: ChunkKind) -> TableResult<&'a [u8]> {
    let chunk = header.chunk(kind);
    let out_of_bounds = || TableError::ChunkOutOfBounds {
        chunk: kind,
        offset: chunk.offset,
        size: chunk.size,
        limit: header.headers_end,
    };
    let end = chunk.end().ok_or_else(out_of_bounds)?;
    if chunk.offset < HEADER_SIZE as u64 || end > header.headers_end {
        return Err(out_of_bounds());
    }
    // headers_end <= bytes.len() was checked, so both casts fit.
    Ok(&bytes[chunk.offset as usize..end as usize])
}

fn records<R: Record>(body: &[u8], header: &Header, kind: ChunkKind) -> TableResult<Vec<R>> {
    let chunk = header.chunk(kind);
    let expected = u64::from(chunk.count).checked_mul(R::SIZE as u64);
    if expected != Some(chunk.size) {
        return Err(TableError::ChunkSizeMismatch {
            chunk: kind,
            count: chunk.count,
            size: chunk.size,
            record_size: R::SIZE,
        });
    }
    Ok(decode_records(body, chunk.count)?)
}

fn check_index(
    chunk: ChunkKind,
    entry: usize,
    field: &'static str,
    index: u32,
    bound: usize,
) -> TableResult<()> {
    if index as usize >= bound {
        return Err(TableError::IndexOutOfRange {
            chunk,
            entry: entry as u32,
            field,
            index: u64::from(index),
            bound: bound as u64,
        });
    }
    Ok(())
}

fn check_range(
    chunk: ChunkKind,
    entry: usize,
    field: &'static str,
    start: u64,
    size: u64,
    region: (u64, u64),
) -> TableResult<()> {
    let end = start.checked_add(size);
    if start < region.0 || end.map_or(true, |end| end > region.1) {
        return Err(TableError::IndexOutOfRange {
            chunk,
            entry: entry as u32,
            field,
            index: start,
            bound: region.1,
        });
    }
    Ok(())
}

/// Validate a whole container image and build its symbol tables.
pub fn validate_tables(bytes: &[u8], config: &ValidationConfig) -> TableResult<SymbolTables> {
    let header = validate_header(bytes)?;
    check_regions(&header, bytes.len() as u64)?;

    let mut bodies = Vec::with_capacity(ChunkKind::COUNT);
    for kind in ChunkKind::ALL {
        bodies.push(chunk_bytes(bytes, &header, kind)?);
    }

    if config.verify_chunk_checksums {
        for (kind, body) in ChunkKind::ALL.into_iter().zip(&bodies) {
            let actual = crc32(body);
            let expected = header.chunk(kind).crc32;
            if actual != expected {
                return Err(TableError::ChunkChecksumMismatch {
                    chunk: kind,
                    expected,
                    actual,
                });
            }
        }
    }

    let text_body = bodies[ChunkKind::Text.index()];
    if text_body.first() != Some(&0x00) {
        return Err(TableError::ReservedEntry {
            chunk: ChunkKind::Text,
        });
    }
    let mut offsets = HashSet::new();
    for entry in text::entries(text_body) {
        let (offset, _) = entry?;
        offsets.insert(offset);
    }
    if offsets.len() != header.chunk(ChunkKind::Text).count as usize {
        return Err(TableError::InvalidText {
            offset: 0,
            reason: format!(
                "chunk holds {} strings, header records {}",
                offsets.len(),
                header.chunk(ChunkKind::Text).count
            ),
        });
    }

    let names: Vec<NameEntry> = records(bodies[1], &header, ChunkKind::Names)?;
    let types: Vec<TypeEntry> = records(bodies[2], &header, ChunkKind::Types)?;
    let properties: Vec<PropertyEntry> = records(bodies[3], &header, ChunkKind::Properties)?;
    let imports: Vec<ImportEntry> = records(bodies[4], &header, ChunkKind::Imports)?;
    let exports: Vec<ExportEntry> = records(bodies[5], &header, ChunkKind::Exports)?;
    let buffers: Vec<BufferEntry> = records(bodies[6], &header, ChunkKind::Buffers)?;

    let reserved = [
        (ChunkKind::Names, names.first() == Some(&NameEntry::default())),
        (ChunkKind::Types, types.first() == Some(&TypeEntry::default())),
        (
            ChunkKind::Properties,
            properties.first() == Some(&PropertyEntry::default()),
        ),
        (ChunkKind::Imports, imports.first() == Some(&ImportEntry::default())),
    ];
    if let Some((chunk, _)) = reserved.into_iter().find(|(_, ok)| !ok) {
        return Err(TableError::ReservedEntry { chunk });
    }

    for (i, name) in names.iter().enumerate() {
        let offset = u64::from(name.string.get());
        if !offsets.contains(&offset) {
            return Err(TableError::IndexOutOfRange {
                chunk: ChunkKind::Names,
                entry: i as u32,
                field: "string",
                index: offset,
                bound: text_body.len() as u64,
            });
        }
    }
    for (i, ty) in types.iter().enumerate() {
        check_index(ChunkKind::Types, i, "name", ty.name.get(), names.len())?;
    }
    for (i, p) in properties.iter().enumerate() {
        check_index(ChunkKind::Properties, i, "class_type", p.class_type.get(), types.len())?;
        check_index(ChunkKind::Properties, i, "value_type", p.value_type.get(), types.len())?;
        check_index(ChunkKind::Properties, i, "name", p.name.get(), names.len())?;
    }
    for (i, import) in imports.iter().enumerate() {
        check_index(ChunkKind::Imports, i, "class_type", import.class_type.get(), types.len())?;
    }
    let objects = (header.headers_end, header.objects_end);
    for (i, export) in exports.iter().enumerate() {
        check_index(ChunkKind::Exports, i, "class_type", export.class_type.get(), types.len())?;
        check_range(
            ChunkKind::Exports,
            i,
            "data_offset",
            export.data_offset,
            export.data_size,
            objects,
        )?;
    }
    let payloads = (header.objects_end, header.buffers_end);
    for (i, buffer) in buffers.iter().enumerate() {
        check_range(
            ChunkKind::Buffers,
            i,
            "file_offset",
            buffer.file_offset,
            u64::from(buffer.compressed_size),
            payloads,
        )?;
    }

    debug!(
        version = header.version,
        names = names.len(),
        types = types.len(),
        properties = properties.len(),
        imports = imports.len(),
        exports = exports.len(),
        buffers = buffers.len(),
        "symbol tables validated"
    );

    Ok(SymbolTables::from_parts(
        header,
        text_body.to_vec(),
        names,
        types,
        properties,
        imports,
        exports,
        buffers,
    ))
}
