//! Buffer fetching.
//!
//! Buffer records are immutable, so a [`BufferInfo`] can be copied to any
//! number of loaders. [`BufferFactory`] fetches synchronously (used by
//! `LoadMode::Full`); [`AsyncBufferLoader`] fetches off the caller's task.

use std::sync::Arc;

use async_trait::async_trait;
use gpak_codec::{checksum64, BufferCodec, StandardCodec};
use gpak_types::BufferInfo;
use serde::Serialize;
use tracing::debug;

use crate::config::CapacityLimits;
use crate::container::Container;
use crate::error::{LoadError, LoadResult};

/// Synchronous source of buffer payloads.
pub trait BufferFactory {
    /// Return the uncompressed payload described by `info`.
    fn fetch(&self, info: &BufferInfo) -> LoadResult<Vec<u8>>;
}

/// Asynchronous source of buffer payloads.
#[async_trait]
pub trait AsyncBufferLoader: Send + Sync {
    async fn load(&self, info: BufferInfo) -> LoadResult<Vec<u8>>;
}

/// Reads buffers out of an opened container.
pub struct ContainerBufferFactory<'c> {
    container: &'c Container,
    codec: Arc<dyn BufferCodec>,
    limits: CapacityLimits,
}

impl<'c> ContainerBufferFactory<'c> {
    pub fn new(container: &'c Container) -> Self {
        Self {
            container,
            codec: Arc::new(StandardCodec::default()),
            limits: CapacityLimits::default(),
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn BufferCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_limits(mut self, limits: CapacityLimits) -> Self {
        self.limits = limits;
        self
    }
}

impl BufferFactory for ContainerBufferFactory<'_> {
    fn fetch(&self, info: &BufferInfo) -> LoadResult<Vec<u8>> {
        let max = self.limits.max_buffer_len;
        self.limits
            .check("stored buffer", u64::from(info.compressed_size), max)?;
        self.limits
            .check("buffer", u64::from(info.uncompressed_size), max)?;
        let stored = self.container.stored_buffer(info)?;
        let data = self.codec.decompress(
            info.compression,
            stored,
            info.uncompressed_size as usize,
        )?;
        if self.container.validation().verify_data_checksums {
            let actual = checksum64(&data);
            if actual != info.checksum {
                return Err(LoadError::BufferChecksumMismatch {
                    checksum: info.checksum,
                    actual,
                });
            }
        }
        debug!(
            checksum = info.checksum,
            stored = info.compressed_size,
            size = data.len(),
            "buffer fetched"
        );
        Ok(data)
    }
}

/// Async loader over a shared container; decompression runs on tokio's
/// blocking pool.
#[derive(Clone)]
pub struct SharedBufferLoader {
    container: Arc<Container>,
    codec: Arc<dyn BufferCodec>,
    limits: CapacityLimits,
}

impl SharedBufferLoader {
    pub fn new(container: Arc<Container>) -> Self {
        Self {
            container,
            codec: Arc::new(StandardCodec::default()),
            limits: CapacityLimits::default(),
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn BufferCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_limits(mut self, limits: CapacityLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }
}

#[async_trait]
impl AsyncBufferLoader for SharedBufferLoader {
    async fn load(&self, info: BufferInfo) -> LoadResult<Vec<u8>> {
        let container = Arc::clone(&self.container);
        let codec = Arc::clone(&self.codec);
        let limits = self.limits;
        tokio::task::spawn_blocking(move || {
            ContainerBufferFactory::new(&container)
                .with_codec(codec)
                .with_limits(limits)
                .fetch(&info)
        })
        .await
        .map_err(|e| LoadError::Task(e.to_string()))?
    }
}

/// A deferred buffer that has not been fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BufferHandle {
    info: BufferInfo,
}

impl BufferHandle {
    pub fn new(info: BufferInfo) -> Self {
        Self { info }
    }

    pub fn info(&self) -> &BufferInfo {
        &self.info
    }

    pub fn fetch(&self, factory: &dyn BufferFactory) -> LoadResult<Vec<u8>> {
        factory.fetch(&self.info)
    }

    pub async fn fetch_async(&self, loader: &dyn AsyncBufferLoader) -> LoadResult<Vec<u8>> {
        loader.load(self.info).await
    }

    /// The stored bytes, without decompression or checksum checks.
    pub fn fetch_raw(&self, container: &Container) -> LoadResult<Vec<u8>> {
        Ok(container.stored_buffer(&self.info)?.to_vec())
    }
}
