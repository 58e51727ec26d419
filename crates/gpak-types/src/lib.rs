//! Foundation types for GPAK containers.
//!
//! Every other GPAK crate depends on `gpak-types`. It holds the small value
//! types that cross crate boundaries: typed table indices, global resource
//! identifiers, and the metadata handed to buffer loaders.
//!
//! # Key Types
//!
//! - [`NameIndex`], [`TypeIndex`], [`PropertyIndex`], ...: typed indices into
//!   the symbol tables; index 0 is reserved as "none" where the table reserves it
//! - [`Guid`]: 128-bit global identifier of an external resource
//! - [`ResourceKey`]: `(class, guid)` pair naming an import
//! - [`CompressionType`]: tag recorded for every buffer payload
//! - [`BufferInfo`]: immutable location of one buffer payload
//! - [`LoadMode`]: how deep a loader walks a container
//! - [`OpcodeTag`]: tag byte of each positional opcode

pub mod buffer;
pub mod error;
pub mod guid;
pub mod ids;
pub mod resource;
pub mod tag;

pub use buffer::{BufferInfo, CompressionType, LoadMode};
pub use error::TypeError;
pub use guid::Guid;
pub use ids::{
    BufferIndex, ExportIndex, ImportIndex, NameIndex, PropertyIndex, StringIndex, TypeIndex,
};
pub use resource::ResourceKey;
pub use tag::{inline_mode, OpcodeTag};
