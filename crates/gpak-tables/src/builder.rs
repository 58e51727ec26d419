use std::collections::HashMap;

use gpak_codec::crc32;
use gpak_store::ContainerSink;
use gpak_types::{
    BufferIndex, ExportIndex, ImportIndex, NameIndex, PropertyIndex, ResourceKey, StringIndex,
    TypeIndex,
};
use tracing::{debug, warn};

use crate::error::{TableError, TableResult};
use crate::header::{flags, Chunk, ChunkKind, Header, HEADER_SIZE, VERSION_CURRENT};
use crate::records::{
    encode_records, BufferEntry, ExportEntry, ImportEntry, NameEntry, PropertyEntry, Record,
    TypeEntry,
};
use crate::tables::SymbolTables;
use crate::text;

/// Absolute end offsets of the regions that follow the tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegionLayout {
    pub objects_end: u64,
    pub buffers_end: u64,
}

/// Write side of the symbol tables.
///
/// Strings, names, types, properties and imports are interned: mapping the
/// same key twice returns the same index. Entry 0 of each of those tables is
/// the reserved empty entry. Exports and buffers are appended as records.
#[derive(Clone, Debug)]
pub struct TableBuilder {
    text: Vec<u8>,
    text_count: u32,
    strings: HashMap<String, StringIndex>,
    names: Vec<NameEntry>,
    name_lookup: HashMap<StringIndex, NameIndex>,
    types: Vec<TypeEntry>,
    type_lookup: HashMap<NameIndex, TypeIndex>,
    properties: Vec<PropertyEntry>,
    property_lookup: HashMap<(TypeIndex, NameIndex), PropertyIndex>,
    imports: Vec<ImportEntry>,
    import_lookup: HashMap<ImportEntry, ImportIndex>,
    exports: Vec<ExportEntry>,
    buffers: Vec<BufferEntry>,
    buffer_lookup: HashMap<u64, BufferIndex>,
    previous: Option<Header>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn next_index(len: usize, chunk: ChunkKind) -> TableResult<u32> {
    u32::try_from(len).map_err(|_| TableError::TableFull { chunk })
}

impl TableBuilder {
    pub fn new() -> Self {
        let mut text = Vec::new();
        text::push(&mut text, "");
        Self {
            text,
            text_count: 1,
            strings: HashMap::from([(String::new(), StringIndex::NONE)]),
            names: vec![NameEntry::default()],
            name_lookup: HashMap::from([(StringIndex::NONE, NameIndex::NONE)]),
            types: vec![TypeEntry::default()],
            type_lookup: HashMap::from([(NameIndex::NONE, TypeIndex::NONE)]),
            properties: vec![PropertyEntry::default()],
            property_lookup: HashMap::from([(
                (TypeIndex::NONE, NameIndex::NONE),
                PropertyIndex::NONE,
            )]),
            imports: vec![ImportEntry::default()],
            import_lookup: HashMap::new(),
            exports: Vec::new(),
            buffers: Vec::new(),
            buffer_lookup: HashMap::new(),
            previous: None,
        }
    }

    /// Seed a builder with the interned tables of an existing container.
    ///
    /// Every existing string, name, type, property and import keeps its
    /// index. Exports and buffers are not carried over; the caller re-adds
    /// the objects it keeps. The written header inherits the previous version
    /// and flags and gains [`flags::INCREMENTAL`].
    pub fn from_tables(tables: &SymbolTables) -> TableResult<Self> {
        let mut builder = Self::new();
        builder.strings.clear();
        builder.text_count = 0;
        for entry in text::entries(tables.text()) {
            let (offset, s) = entry?;
            let index = StringIndex::new(next_index(offset as usize, ChunkKind::Text)?);
            builder.strings.entry(s.to_owned()).or_insert(index);
            builder.text_count += 1;
        }
        builder.text = tables.text().to_vec();

        builder.names = tables.names().to_vec();
        builder.name_lookup.clear();
        for (i, name) in builder.names.iter().enumerate() {
            builder
                .name_lookup
                .entry(name.string)
                .or_insert(NameIndex::new(i as u32));
        }

        builder.types = tables.types().to_vec();
        builder.type_lookup.clear();
        for (i, ty) in builder.types.iter().enumerate() {
            builder
                .type_lookup
                .entry(ty.name)
                .or_insert(TypeIndex::new(i as u32));
        }

        builder.properties = tables.properties().to_vec();
        builder.property_lookup.clear();
        for (i, p) in builder.properties.iter().enumerate() {
            builder
                .property_lookup
                .entry((p.class_type, p.name))
                .or_insert(PropertyIndex::new(i as u32));
        }

        builder.imports = tables.imports().to_vec();
        for (i, import) in builder.imports.iter().enumerate().skip(1) {
            builder
                .import_lookup
                .entry(*import)
                .or_insert(ImportIndex::new(i as u32));
        }

        builder.previous = Some(tables.header().clone());
        debug!(
            strings = builder.text_count,
            names = builder.names.len(),
            types = builder.types.len(),
            "table builder seeded from existing container"
        );
        Ok(builder)
    }

    pub fn map_string(&mut self, s: &str) -> TableResult<StringIndex> {
        if let Some(&index) = self.strings.get(s) {
            return Ok(index);
        }
        let offset = next_index(self.text.len(), ChunkKind::Text)?;
        if u32::try_from(s.len()).is_err() {
            return Err(TableError::TableFull {
                chunk: ChunkKind::Text,
            });
        }
        let index = StringIndex::new(offset);
        text::push(&mut self.text, s);
        self.text_count += 1;
        self.strings.insert(s.to_owned(), index);
        Ok(index)
    }

    pub fn map_name(&mut self, name: &str) -> TableResult<NameIndex> {
        let string = self.map_string(name)?;
        if let Some(&index) = self.name_lookup.get(&string) {
            return Ok(index);
        }
        let index = NameIndex::new(next_index(self.names.len(), ChunkKind::Names)?);
        self.names.push(NameEntry { string });
        self.name_lookup.insert(string, index);
        Ok(index)
    }

    pub fn map_type(&mut self, type_name: &str) -> TableResult<TypeIndex> {
        let name = self.map_name(type_name)?;
        if let Some(&index) = self.type_lookup.get(&name) {
            return Ok(index);
        }
        let index = TypeIndex::new(next_index(self.types.len(), ChunkKind::Types)?);
        self.types.push(TypeEntry { name });
        self.type_lookup.insert(name, index);
        Ok(index)
    }

    /// Intern a property keyed by `(class, property)`.
    ///
    /// A property is recorded with the value type it was first mapped with.
    /// Mapping it again with a different value type returns the existing
    /// index unchanged.
    pub fn map_property(
        &mut self,
        class: &str,
        property: &str,
        value_type: &str,
    ) -> TableResult<PropertyIndex> {
        let class_type = self.map_type(class)?;
        let name = self.map_name(property)?;
        let value = self.map_type(value_type)?;
        if let Some(&index) = self.property_lookup.get(&(class_type, name)) {
            let recorded = self.properties[index.as_usize()].value_type;
            if recorded != value && !index.is_none() {
                warn!(
                    class,
                    property,
                    value_type,
                    recorded = %recorded,
                    "property remapped with a different value type; keeping the first"
                );
            }
            return Ok(index);
        }
        let index = PropertyIndex::new(next_index(self.properties.len(), ChunkKind::Properties)?);
        self.properties.push(PropertyEntry {
            class_type,
            value_type: value,
            name,
        });
        self.property_lookup.insert((class_type, name), index);
        Ok(index)
    }

    /// Intern an external reference. A null guid always maps to the reserved entry.
    pub fn map_import(&mut self, key: &ResourceKey) -> TableResult<ImportIndex> {
        if key.is_null() {
            return Ok(ImportIndex::NONE);
        }
        let entry = ImportEntry {
            class_type: self.map_type(&key.class)?,
            guid: key.guid,
        };
        if let Some(&index) = self.import_lookup.get(&entry) {
            return Ok(index);
        }
        let index = ImportIndex::new(next_index(self.imports.len(), ChunkKind::Imports)?);
        self.imports.push(entry);
        self.import_lookup.insert(entry, index);
        Ok(index)
    }

    pub fn push_export(&mut self, entry: ExportEntry) -> TableResult<ExportIndex> {
        let index = ExportIndex::new(next_index(self.exports.len(), ChunkKind::Exports)?);
        self.exports.push(entry);
        Ok(index)
    }

    /// Append a buffer record, or return the existing one with the same checksum.
    pub fn push_buffer(&mut self, entry: BufferEntry) -> TableResult<BufferIndex> {
        if let Some(&index) = self.buffer_lookup.get(&entry.checksum) {
            return Ok(index);
        }
        let index = BufferIndex::new(next_index(self.buffers.len(), ChunkKind::Buffers)?);
        self.buffers.push(entry);
        self.buffer_lookup.insert(entry.checksum, index);
        Ok(index)
    }

    pub fn find_buffer(&self, checksum: u64) -> Option<BufferIndex> {
        self.buffer_lookup.get(&checksum).copied()
    }

    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn import_count(&self) -> usize {
        self.imports.len()
    }

    pub fn exports(&self) -> &[ExportEntry] {
        &self.exports
    }

    pub fn buffers(&self) -> &[BufferEntry] {
        &self.buffers
    }

    /// Header plus chunks as they would be written now.
    pub fn encoded_len(&self) -> u64 {
        self.encoded_len_with(self.exports.len(), self.buffers.len())
    }

    /// Header plus chunks once the export and buffer tables hold the given
    /// number of records. The interned tables must not grow afterwards.
    pub fn encoded_len_with(&self, exports: usize, buffers: usize) -> u64 {
        (HEADER_SIZE
            + self.text.len()
            + self.names.len() * NameEntry::SIZE
            + self.types.len() * TypeEntry::SIZE
            + self.properties.len() * PropertyEntry::SIZE
            + self.imports.len() * ImportEntry::SIZE
            + exports * ExportEntry::SIZE
            + buffers * BufferEntry::SIZE) as u64
    }

    fn chunk(&self, kind: ChunkKind) -> (Vec<u8>, u32) {
        match kind {
            ChunkKind::Text => (self.text.clone(), self.text_count),
            ChunkKind::Names => (encode_records(&self.names), self.names.len() as u32),
            ChunkKind::Types => (encode_records(&self.types), self.types.len() as u32),
            ChunkKind::Properties => (
                encode_records(&self.properties),
                self.properties.len() as u32,
            ),
            ChunkKind::Imports => (encode_records(&self.imports), self.imports.len() as u32),
            ChunkKind::Exports => (encode_records(&self.exports), self.exports.len() as u32),
            ChunkKind::Buffers => (encode_records(&self.buffers), self.buffers.len() as u32),
        }
    }

    /// Write the header and every chunk at the sink's current position.
    ///
    /// A placeholder header goes first; once all chunk records are known the
    /// sealed header is patched in and the sink is left at the end of the
    /// tables. The returned header carries no region checksums yet.
    pub fn write(&self, sink: &mut dyn ContainerSink, regions: RegionLayout) -> TableResult<Header> {
        let base = sink.pos();
        let (version, mut header_flags) = match &self.previous {
            Some(previous) => (previous.version, previous.flags | flags::INCREMENTAL),
            None => (VERSION_CURRENT, 0),
        };
        if self.buffers.is_empty() {
            header_flags &= !flags::HAS_BUFFERS;
        } else {
            header_flags |= flags::HAS_BUFFERS;
        }
        let mut header = Header::new(version, header_flags);

        sink.write_all(&[0u8; HEADER_SIZE])?;
        for kind in ChunkKind::ALL {
            let (bytes, count) = self.chunk(kind);
            let offset = sink.pos() - base;
            sink.write_all(&bytes)?;
            *header.chunk_mut(kind) = Chunk {
                offset,
                size: bytes.len() as u64,
                count,
                crc32: crc32(&bytes),
            };
            debug!(chunk = %kind, offset, size = bytes.len(), count, "chunk written");
        }

        header.headers_end = sink.pos() - base;
        debug_assert_eq!(header.headers_end, self.encoded_len());
        for (region, start, end) in [
            ("objects", header.headers_end, regions.objects_end),
            ("buffers", regions.objects_end, regions.buffers_end),
        ] {
            if start > end {
                return Err(TableError::RegionOutOfBounds {
                    region,
                    start,
                    end,
                    limit: end,
                });
            }
        }
        header.objects_end = regions.objects_end;
        header.buffers_end = regions.buffers_end;
        header.seal();
        header.patch(sink, base)?;
        Ok(header)
    }
}
