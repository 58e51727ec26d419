//! Low-level codecs for GPAK containers.
//!
//! - [`adaptive`]: the 1-5 byte signed/unsigned integer encoding used for every
//!   size, index and offset in the format
//! - [`checksum`]: CRC32 for chunks and export bodies, a rolling 64-bit hash
//!   for whole regions and buffer keys
//! - [`reader`]: bounds-checked cursor over a byte slice
//! - [`compression`]: the [`BufferCodec`] seam for buffer payloads

pub mod adaptive;
pub mod checksum;
pub mod compression;
pub mod error;
pub mod reader;

pub use checksum::{checksum64, crc32, RollingChecksum};
pub use compression::{BufferCodec, StandardCodec};
pub use error::{CodecError, CodecResult};
pub use reader::ByteReader;
