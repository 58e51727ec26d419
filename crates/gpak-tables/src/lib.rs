//! Symbol tables for GPAK containers.
//!
//! A container starts with a fixed-size [`Header`] followed by seven chunks,
//! one per table, in a fixed order:
//!
//! ```text
//! [header][text][names][types][properties][imports][exports][buffers]
//! ```
//!
//! - [`TableBuilder`]: the write side. Interns strings, names, types,
//!   properties and imports exactly once, collects export and buffer records,
//!   and writes header plus chunks through a `ContainerSink`.
//! - [`SymbolTables`]: the read side. Produced by [`validate_tables`], which
//!   checks magic, version range, checksums and every cross-table index
//!   before any lookup is allowed.

pub mod builder;
pub mod error;
pub mod header;
pub mod records;
pub mod tables;
pub mod text;
pub mod validate;

pub use builder::{RegionLayout, TableBuilder};
pub use error::{TableError, TableResult};
pub use header::{
    flags, Chunk, ChunkKind, Header, HEADER_SIZE, MAGIC, VERSION_CURRENT, VERSION_MAX, VERSION_MIN,
};
pub use records::{
    BufferEntry, ExportEntry, ImportEntry, NameEntry, PropertyEntry, Record, TypeEntry,
};
pub use tables::{ResolvedImport, ResolvedProperty, SymbolTables};
pub use validate::{validate_header, validate_tables, ValidationConfig};
