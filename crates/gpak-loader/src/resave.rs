//! Copying exports forward into a new container.
//!
//! An incremental save seeds its table builder with
//! `TableBuilder::from_tables(container.tables())`, so the positional bodies
//! of the old exports stay valid and can be copied without re-encoding. The
//! deferred buffers they reference are carried along in stored form.

use std::collections::HashSet;

use gpak_binarizer::{ObjectBody, PendingBuffer, SaveObject};
use gpak_types::{BufferInfo, ExportIndex, LoadMode};
use tracing::debug;

use crate::config::LoadConfig;
use crate::container::Container;
use crate::error::LoadResult;
use crate::loader::{Loader, ObjectConstructor, ObjectInfo};
use crate::opcode::{BufferPayload, ResolvedOpcode};

#[derive(Default)]
struct BufferRefs {
    current: Vec<BufferInfo>,
    seen: HashSet<u64>,
    objects: Vec<(String, u32, Vec<BufferInfo>)>,
}

impl ObjectConstructor for BufferRefs {
    fn begin_object(&mut self, object: &ObjectInfo<'_>) -> LoadResult<()> {
        self.current.clear();
        self.seen.clear();
        self.objects
            .push((object.class.to_owned(), object.flags, Vec::new()));
        Ok(())
    }

    fn visit(&mut self, op: ResolvedOpcode<'_>) -> LoadResult<()> {
        if let ResolvedOpcode::DataDeferredBuffer(BufferPayload::Deferred(handle)) = op {
            let info = *handle.info();
            if self.seen.insert(info.checksum) {
                self.current.push(info);
            }
        }
        Ok(())
    }

    fn end_object(&mut self, _export: ExportIndex) -> LoadResult<()> {
        if let Some(last) = self.objects.last_mut() {
            last.2 = std::mem::take(&mut self.current);
        }
        Ok(())
    }
}

impl Container {
    /// Every export as an [`ObjectBody::Encoded`] save object, in export
    /// order, with the stored bytes of each deferred buffer it references.
    ///
    /// Passing these first keeps object pointers between the copied exports
    /// valid.
    pub fn encoded_objects(&self) -> LoadResult<Vec<SaveObject>> {
        let mut refs = BufferRefs::default();
        let mut config = LoadConfig::with_mode(LoadMode::NoBuffers);
        config.validation = *self.validation();
        Loader::new(self, config).load(&mut refs)?;

        let mut out = Vec::with_capacity(refs.objects.len());
        for (i, (class, flags, infos)) in refs.objects.into_iter().enumerate() {
            let bytes = self.body(ExportIndex::new(i as u32))?.to_vec();
            let buffers = infos
                .iter()
                .map(|info| self.pending_buffer(info))
                .collect::<LoadResult<Vec<_>>>()?;
            out.push(SaveObject {
                class,
                flags,
                body: ObjectBody::Encoded { bytes, buffers },
            });
        }
        debug!(objects = out.len(), "exports copied for re-save");
        Ok(out)
    }

    /// A deferred buffer in the form the binarizer writes, without
    /// decompressing it.
    pub fn pending_buffer(&self, info: &BufferInfo) -> LoadResult<PendingBuffer> {
        Ok(PendingBuffer::from_stored(
            info.checksum,
            info.uncompressed_size,
            info.compression,
            self.stored_buffer(info)?.to_vec(),
        ))
    }
}
