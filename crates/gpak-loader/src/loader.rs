use std::borrow::Cow;

use gpak_codec::ByteReader;
use gpak_types::{
    inline_mode, ExportIndex, ImportIndex, LoadMode, NameIndex, OpcodeTag, PropertyIndex,
    ResourceKey, TypeIndex,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::buffers::{BufferFactory, BufferHandle, ContainerBufferFactory};
use crate::config::LoadConfig;
use crate::container::Container;
use crate::error::{LoadError, LoadResult};
use crate::opcode::{BufferPayload, PropertyRef, ResolvedOpcode};

/// Identity of the object being delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectInfo<'a> {
    pub export: ExportIndex,
    pub class: &'a str,
    pub flags: u32,
    pub size: u64,
}

/// Receives loaded objects.
///
/// For every export, in table order, the loader calls `begin_object`, then
/// `visit` once per opcode, then `end_object`. An error from any call stops
/// the load and is returned unchanged.
pub trait ObjectConstructor {
    fn begin_object(&mut self, object: &ObjectInfo<'_>) -> LoadResult<()>;

    fn visit(&mut self, op: ResolvedOpcode<'_>) -> LoadResult<()>;

    fn end_object(&mut self, export: ExportIndex) -> LoadResult<()>;
}

/// What a load delivered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub mode: LoadMode,
    pub objects: usize,
    pub opcodes: usize,
    pub buffers_fetched: usize,
    pub buffers_deferred: usize,
    pub dependencies: Vec<ResourceKey>,
}

/// Walks the exports of a [`Container`] and feeds an [`ObjectConstructor`].
pub struct Loader<'c> {
    container: &'c Container,
    config: LoadConfig,
    factory: Box<dyn BufferFactory + 'c>,
}

impl<'c> Loader<'c> {
    pub fn new(container: &'c Container, config: LoadConfig) -> Self {
        let factory = ContainerBufferFactory::new(container).with_limits(config.limits);
        Self {
            container,
            config,
            factory: Box::new(factory),
        }
    }

    /// Replace the factory used for deferred buffers in `LoadMode::Full`.
    pub fn with_factory(mut self, factory: Box<dyn BufferFactory + 'c>) -> Self {
        self.factory = factory;
        self
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub fn load(&self, constructor: &mut dyn ObjectConstructor) -> LoadResult<LoadReport> {
        let mut report = LoadReport {
            mode: self.config.mode,
            dependencies: self.container.dependencies()?,
            ..LoadReport::default()
        };
        if self.config.mode == LoadMode::DependenciesOnly {
            info!(dependencies = report.dependencies.len(), "dependencies listed");
            return Ok(report);
        }
        for i in 0..self.container.tables().exports().len() {
            self.load_object(ExportIndex::new(i as u32), constructor, &mut report)?;
        }
        info!(
            mode = %report.mode,
            objects = report.objects,
            buffers_fetched = report.buffers_fetched,
            buffers_deferred = report.buffers_deferred,
            "container loaded"
        );
        Ok(report)
    }

    fn load_object(
        &self,
        export: ExportIndex,
        constructor: &mut dyn ObjectConstructor,
        report: &mut LoadReport,
    ) -> LoadResult<()> {
        let tables = self.container.tables();
        let entry = tables.export(export)?;
        let body = self.container.body(export)?;
        constructor.begin_object(&ObjectInfo {
            export,
            class: tables.type_name(entry.class_type)?,
            flags: entry.flags,
            size: entry.data_size,
        })?;

        let mut r = ByteReader::new(body);
        let mut open: Vec<usize> = Vec::new();
        loop {
            while open.last() == Some(&r.position()) {
                open.pop();
                constructor.visit(ResolvedOpcode::SkipLabel)?;
                report.opcodes += 1;
            }
            if r.is_empty() {
                break;
            }
            let offset = r.position();
            let op = self
                .decode(export, body, &mut r, &mut open, report)
                .map_err(|e| match e {
                    LoadError::Codec(e) => LoadError::MalformedBody {
                        export,
                        offset,
                        reason: e.to_string(),
                    },
                    other => other,
                })?;
            constructor.visit(op)?;
            report.opcodes += 1;
        }
        if let Some(&end) = open.last() {
            return Err(LoadError::MalformedBody {
                export,
                offset: end,
                reason: format!("skip region ends past the body ({} bytes)", body.len()),
            });
        }

        constructor.end_object(export)?;
        report.objects += 1;
        debug!(export = %export, size = body.len(), "object loaded");
        Ok(())
    }

    fn decode<'b>(
        &self,
        export: ExportIndex,
        body: &'b [u8],
        r: &mut ByteReader<'b>,
        open: &mut Vec<usize>,
        report: &mut LoadReport,
    ) -> LoadResult<ResolvedOpcode<'b>>
    where
        'c: 'b,
    {
        let tables = self.container.tables();
        let limits = &self.config.limits;
        let offset = r.position();
        let byte = r.read_u8()?;
        let tag = OpcodeTag::from_byte(byte).ok_or(LoadError::UnknownOpcode {
            export,
            offset,
            tag: byte,
        })?;
        let malformed = |reason: String| LoadError::MalformedBody {
            export,
            offset,
            reason,
        };

        let op = match tag {
            OpcodeTag::SkipHeader => {
                let distance = r.read_adaptive_u32()? as usize;
                let end = offset.checked_add(distance).unwrap_or(usize::MAX);
                let limit = open.last().copied().unwrap_or(body.len());
                if end < r.position() || end > limit {
                    return Err(malformed(format!(
                        "skip distance {distance} leaves the enclosing region"
                    )));
                }
                limits.check(
                    "skip depth",
                    (open.len() + 1) as u64,
                    limits.max_skip_depth as u64,
                )?;
                open.push(end);
                ResolvedOpcode::SkipHeader { end }
            }
            OpcodeTag::Property => {
                let index = PropertyIndex::new(r.read_adaptive_u32()?);
                ResolvedOpcode::Property(PropertyRef::from(tables.property(index)?))
            }
            OpcodeTag::DataBlock1 | OpcodeTag::DataBlock2 | OpcodeTag::DataBlock4 => {
                let (width, len) = match tag {
                    OpcodeTag::DataBlock1 => (1, u64::from(r.read_u8()?)),
                    OpcodeTag::DataBlock2 => (2, u64::from(r.read_u16()?)),
                    _ => (4, u64::from(r.read_u32()?)),
                };
                limits.check("data block", len, limits.max_block_len)?;
                ResolvedOpcode::DataBlock {
                    width,
                    bytes: Cow::Borrowed(r.read_bytes(len as usize)?),
                }
            }
            OpcodeTag::DataTypeRef => {
                let index = TypeIndex::new(r.read_adaptive_u32()?);
                ResolvedOpcode::DataTypeRef(Cow::Borrowed(tables.type_name(index)?))
            }
            OpcodeTag::DataName => {
                let index = NameIndex::new(r.read_adaptive_u32()?);
                ResolvedOpcode::DataName(Cow::Borrowed(tables.name(index)?))
            }
            OpcodeTag::DataObjectPointer => {
                let target = ExportIndex::from_pointer(r.read_adaptive_u32()?);
                if let Some(target) = target {
                    tables.export(target)?;
                }
                ResolvedOpcode::DataObjectPointer(target)
            }
            OpcodeTag::DataResourceRef => {
                let index = ImportIndex::new(r.read_adaptive_u32()?);
                let key = tables.import(index)?.map(|import| import.to_key());
                ResolvedOpcode::DataResourceRef(key)
            }
            OpcodeTag::DataAdaptiveNumber => {
                ResolvedOpcode::DataAdaptiveNumber(r.read_adaptive_i32()?)
            }
            OpcodeTag::DataInlineBuffer => match r.read_u8()? {
                inline_mode::EMBEDDED => {
                    let len = u64::from(r.read_adaptive_u32()?);
                    limits.check("inline buffer", len, limits.max_inline_buffer_len)?;
                    ResolvedOpcode::DataInlineBuffer(Cow::Borrowed(r.read_bytes(len as usize)?))
                }
                inline_mode::DEFERRED => {
                    let checksum = r.read_u64()?;
                    let info = tables
                        .find_buffer(checksum)
                        .ok_or(LoadError::UnknownBuffer { checksum })?;
                    let payload = if self.config.mode == LoadMode::Full {
                        report.buffers_fetched += 1;
                        BufferPayload::Loaded(self.factory.fetch(&info)?)
                    } else {
                        report.buffers_deferred += 1;
                        BufferPayload::Deferred(BufferHandle::new(info))
                    };
                    ResolvedOpcode::DataDeferredBuffer(payload)
                }
                mode => return Err(malformed(format!("unknown inline buffer mode {mode}"))),
            },
        };
        Ok(op)
    }
}
