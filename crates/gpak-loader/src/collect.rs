use gpak_types::ExportIndex;
use serde::Serialize;

use crate::error::{LoadError, LoadResult};
use crate::loader::{ObjectConstructor, ObjectInfo};
use crate::opcode::{PropertyRef, ResolvedOpcode};

/// An object as recorded by [`GraphCollector`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoadedObject {
    pub export: ExportIndex,
    pub class: String,
    pub flags: u32,
    pub opcodes: Vec<ResolvedOpcode<'static>>,
}

impl LoadedObject {
    /// Each property paired with the opcode that follows it, if any.
    pub fn properties(
        &self,
    ) -> impl Iterator<Item = (&PropertyRef<'static>, Option<&ResolvedOpcode<'static>>)> {
        self.opcodes.iter().enumerate().filter_map(|(i, op)| match op {
            ResolvedOpcode::Property(p) => Some((p, self.opcodes.get(i + 1))),
            _ => None,
        })
    }

    /// The value following the property `name`, if the object has one.
    pub fn value(&self, name: &str) -> Option<&ResolvedOpcode<'static>> {
        self.properties()
            .find(|(p, _)| p.name == name)
            .and_then(|(_, value)| value)
    }
}

/// Records every object as an owned [`LoadedObject`].
#[derive(Debug, Default)]
pub struct GraphCollector {
    objects: Vec<LoadedObject>,
    current: Option<LoadedObject>,
}

impl GraphCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> &[LoadedObject] {
        &self.objects
    }

    pub fn get(&self, export: ExportIndex) -> Option<&LoadedObject> {
        self.objects.iter().find(|o| o.export == export)
    }

    pub fn into_objects(self) -> Vec<LoadedObject> {
        self.objects
    }
}

impl ObjectConstructor for GraphCollector {
    fn begin_object(&mut self, object: &ObjectInfo<'_>) -> LoadResult<()> {
        if let Some(open) = &self.current {
            return Err(LoadError::Constructor {
                export: object.export,
                reason: format!("export {} was never ended", open.export),
            });
        }
        self.current = Some(LoadedObject {
            export: object.export,
            class: object.class.to_owned(),
            flags: object.flags,
            opcodes: Vec::new(),
        });
        Ok(())
    }

    fn visit(&mut self, op: ResolvedOpcode<'_>) -> LoadResult<()> {
        if let Some(current) = self.current.as_mut() {
            current.opcodes.push(op.into_owned());
        }
        Ok(())
    }

    fn end_object(&mut self, export: ExportIndex) -> LoadResult<()> {
        match self.current.take() {
            Some(object) if object.export == export => {
                self.objects.push(object);
                Ok(())
            }
            _ => Err(LoadError::Constructor {
                export,
                reason: "end without matching begin".to_owned(),
            }),
        }
    }
}
