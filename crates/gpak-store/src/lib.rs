//! Byte-level I/O for GPAK containers.
//!
//! The serialization core never touches files directly. Writes go through the
//! [`ContainerSink`] trait and reads come from a [`ContainerBytes`] source.
//!
//! # Backends
//!
//! - [`MemorySink`] -- growable `Vec<u8>` sink for tests and embedding
//! - [`FileSink`] -- sink over a [`std::fs::File`]
//! - [`ContainerBytes`] -- owned bytes or a read-only memory mapping
//!
//! # Design Rules
//!
//! 1. A sink reports how many bytes it accepted; `write_all` turns a short
//!    write into [`StoreError::ShortWrite`]. Nothing retries.
//! 2. Sinks support seek-back-and-patch so a header can be rewritten in place.
//! 3. Sources are immutable once opened.

pub mod error;
pub mod file;
pub mod memory;
pub mod source;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileSink;
pub use memory::MemorySink;
pub use source::ContainerBytes;
pub use traits::ContainerSink;
