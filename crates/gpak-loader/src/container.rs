use std::path::Path;

use gpak_codec::{crc32, RollingChecksum};
use gpak_store::ContainerBytes;
use gpak_tables::{validate_tables, Header, SymbolTables, ValidationConfig};
use gpak_types::{BufferInfo, ExportIndex, ResourceKey};
use tracing::debug;

use crate::error::{LoadError, LoadResult};

/// An opened, validated container.
///
/// Holds the raw bytes (owned or memory-mapped) next to the symbol tables
/// decoded from them. Immutable after construction, so it can be shared
/// across threads behind an `Arc`.
#[derive(Debug)]
pub struct Container {
    bytes: ContainerBytes,
    tables: SymbolTables,
    validation: ValidationConfig,
}

fn region_checksum(bytes: &[u8]) -> u64 {
    let mut rolling = RollingChecksum::REGION;
    rolling.update(bytes);
    rolling.finish()
}

impl Container {
    /// Memory-map and validate the container at `path`.
    pub fn open(path: &Path, validation: &ValidationConfig) -> LoadResult<Self> {
        Self::from_container_bytes(ContainerBytes::map(path)?, validation)
    }

    /// Read the container at `path` into memory and validate it.
    pub fn read(path: &Path, validation: &ValidationConfig) -> LoadResult<Self> {
        Self::from_container_bytes(ContainerBytes::read(path)?, validation)
    }

    pub fn from_bytes(bytes: Vec<u8>, validation: &ValidationConfig) -> LoadResult<Self> {
        Self::from_container_bytes(ContainerBytes::from_vec(bytes), validation)
    }

    pub fn from_container_bytes(
        bytes: ContainerBytes,
        validation: &ValidationConfig,
    ) -> LoadResult<Self> {
        let tables = validate_tables(&bytes, validation)?;
        let container = Self {
            bytes,
            tables,
            validation: *validation,
        };
        if validation.verify_data_checksums {
            container.verify_data()?;
        }
        debug!(
            len = container.bytes.len(),
            mapped = container.bytes.is_mapped(),
            exports = container.tables.exports().len(),
            "container opened"
        );
        Ok(container)
    }

    pub fn header(&self) -> &Header {
        self.tables.header()
    }

    pub fn tables(&self) -> &SymbolTables {
        &self.tables
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_mapped(&self) -> bool {
        self.bytes.is_mapped()
    }

    pub fn validation(&self) -> &ValidationConfig {
        &self.validation
    }

    /// Check both region checksums and every export body's crc32.
    pub fn verify_data(&self) -> LoadResult<()> {
        let header = self.header();
        // Region bounds were checked by table validation.
        let regions = [
            (
                "objects",
                header.headers_end,
                header.objects_end,
                header.objects_checksum,
            ),
            (
                "buffers",
                header.objects_end,
                header.buffers_end,
                header.buffers_checksum,
            ),
        ];
        for (region, start, end, expected) in regions {
            let actual = region_checksum(&self.bytes[start as usize..end as usize]);
            if actual != expected {
                return Err(LoadError::RegionChecksumMismatch {
                    region,
                    expected,
                    actual,
                });
            }
        }
        for i in 0..self.tables.exports().len() {
            let export = ExportIndex::new(i as u32);
            let expected = self.tables.export(export)?.checksum;
            let actual = crc32(self.body(export)?);
            if actual != expected {
                return Err(LoadError::ExportChecksumMismatch {
                    export,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Body bytes of one export.
    pub fn body(&self, export: ExportIndex) -> LoadResult<&[u8]> {
        let entry = self.tables.export(export)?;
        let start = entry.data_offset as usize;
        Ok(&self.bytes[start..start + entry.data_size as usize])
    }

    /// Stored (possibly compressed) bytes of a buffer.
    pub fn stored_buffer(&self, info: &BufferInfo) -> LoadResult<&[u8]> {
        let header = self.header();
        let start = info.file_offset;
        let end = start.checked_add(u64::from(info.compressed_size));
        match end {
            Some(end) if start >= header.objects_end && end <= header.buffers_end => {
                Ok(&self.bytes[start as usize..end as usize])
            }
            _ => Err(LoadError::UnknownBuffer {
                checksum: info.checksum,
            }),
        }
    }

    /// External resources this container references.
    pub fn dependencies(&self) -> LoadResult<Vec<ResourceKey>> {
        Ok(self
            .tables
            .dependencies()?
            .iter()
            .map(|import| import.to_key())
            .collect())
    }
}
