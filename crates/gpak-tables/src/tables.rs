use std::collections::HashMap;

use gpak_types::{
    BufferIndex, BufferInfo, ExportIndex, Guid, ImportIndex, NameIndex, PropertyIndex,
    ResourceKey, StringIndex, TypeIndex,
};
use serde::Serialize;

use crate::error::{TableError, TableResult};
use crate::header::{ChunkKind, Header};
use crate::records::{BufferEntry, ExportEntry, ImportEntry, NameEntry, PropertyEntry, TypeEntry};
use crate::text;

/// A property entry with every name resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedProperty<'a> {
    pub index: PropertyIndex,
    pub class: &'a str,
    pub name: &'a str,
    pub value_type: &'a str,
}

/// An import entry with its class name resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedImport<'a> {
    pub index: ImportIndex,
    pub class: &'a str,
    pub guid: Guid,
}

impl ResolvedImport<'_> {
    pub fn to_key(&self) -> ResourceKey {
        ResourceKey::new(self.class, self.guid)
    }
}

/// Validated, read-only symbol tables of one container.
///
/// Only [`crate::validate_tables`] constructs these, so every cross-table
/// index stored inside is known to be in range. Lookups taking an index from
/// elsewhere (an object body) are still bounds-checked.
#[derive(Clone, Debug)]
pub struct SymbolTables {
    header: Header,
    text: Vec<u8>,
    names: Vec<NameEntry>,
    types: Vec<TypeEntry>,
    properties: Vec<PropertyEntry>,
    imports: Vec<ImportEntry>,
    exports: Vec<ExportEntry>,
    buffers: Vec<BufferEntry>,
    buffer_index: HashMap<u64, BufferIndex>,
}

fn entry<T>(entries: &[T], chunk: ChunkKind, index: u32) -> TableResult<&T> {
    entries
        .get(index as usize)
        .ok_or(TableError::EntryNotFound {
            chunk,
            index: u64::from(index),
            count: entries.len() as u64,
        })
}

impl SymbolTables {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        header: Header,
        text: Vec<u8>,
        names: Vec<NameEntry>,
        types: Vec<TypeEntry>,
        properties: Vec<PropertyEntry>,
        imports: Vec<ImportEntry>,
        exports: Vec<ExportEntry>,
        buffers: Vec<BufferEntry>,
    ) -> Self {
        let buffer_index = buffers
            .iter()
            .enumerate()
            .map(|(i, b)| (b.checksum, BufferIndex::new(i as u32)))
            .collect();
        Self {
            header,
            text,
            names,
            types,
            properties,
            imports,
            exports,
            buffers,
            buffer_index,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn text(&self) -> &[u8] {
        &self.text
    }

    pub fn names(&self) -> &[NameEntry] {
        &self.names
    }

    pub fn types(&self) -> &[TypeEntry] {
        &self.types
    }

    pub fn properties(&self) -> &[PropertyEntry] {
        &self.properties
    }

    pub fn imports(&self) -> &[ImportEntry] {
        &self.imports
    }

    pub fn exports(&self) -> &[ExportEntry] {
        &self.exports
    }

    pub fn buffers(&self) -> &[BufferEntry] {
        &self.buffers
    }

    pub fn string(&self, index: StringIndex) -> TableResult<&str> {
        text::read(&self.text, u64::from(index.get()))
    }

    pub fn name(&self, index: NameIndex) -> TableResult<&str> {
        let entry = entry(&self.names, ChunkKind::Names, index.get())?;
        self.string(entry.string)
    }

    pub fn type_name(&self, index: TypeIndex) -> TableResult<&str> {
        let entry = entry(&self.types, ChunkKind::Types, index.get())?;
        self.name(entry.name)
    }

    pub fn property(&self, index: PropertyIndex) -> TableResult<ResolvedProperty<'_>> {
        let entry = entry(&self.properties, ChunkKind::Properties, index.get())?;
        Ok(ResolvedProperty {
            index,
            class: self.type_name(entry.class_type)?,
            name: self.name(entry.name)?,
            value_type: self.type_name(entry.value_type)?,
        })
    }

    /// Resolve an import; the reserved entry resolves to `None`.
    pub fn import(&self, index: ImportIndex) -> TableResult<Option<ResolvedImport<'_>>> {
        let entry = entry(&self.imports, ChunkKind::Imports, index.get())?;
        if index.is_none() {
            return Ok(None);
        }
        Ok(Some(ResolvedImport {
            index,
            class: self.type_name(entry.class_type)?,
            guid: entry.guid,
        }))
    }

    pub fn export(&self, index: ExportIndex) -> TableResult<&ExportEntry> {
        entry(&self.exports, ChunkKind::Exports, index.get())
    }

    pub fn buffer(&self, index: BufferIndex) -> TableResult<&BufferEntry> {
        entry(&self.buffers, ChunkKind::Buffers, index.get())
    }

    /// Locate a buffer record by the checksum its payload was saved under.
    pub fn find_buffer(&self, checksum: u64) -> Option<BufferInfo> {
        self.buffer_index
            .get(&checksum)
            .and_then(|i| self.buffers.get(i.as_usize()))
            .map(BufferEntry::info)
    }

    /// Every import except the reserved entry, in table order.
    pub fn dependencies(&self) -> TableResult<Vec<ResolvedImport<'_>>> {
        let mut out = Vec::with_capacity(self.imports.len().saturating_sub(1));
        for i in 1..self.imports.len() {
            if let Some(import) = self.import(ImportIndex::new(i as u32))? {
                out.push(import);
            }
        }
        Ok(out)
    }
}
