use std::borrow::Cow;

use gpak_tables::ResolvedProperty;
use gpak_types::{ExportIndex, PropertyIndex, ResourceKey};
use serde::Serialize;

use crate::buffers::BufferHandle;

/// A property reference with its names resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PropertyRef<'a> {
    pub index: PropertyIndex,
    pub class: Cow<'a, str>,
    pub name: Cow<'a, str>,
    /// Value type recorded when the container was written.
    pub value_type: Cow<'a, str>,
}

impl<'a> From<ResolvedProperty<'a>> for PropertyRef<'a> {
    fn from(p: ResolvedProperty<'a>) -> Self {
        Self {
            index: p.index,
            class: Cow::Borrowed(p.class),
            name: Cow::Borrowed(p.name),
            value_type: Cow::Borrowed(p.value_type),
        }
    }
}

impl PropertyRef<'_> {
    pub fn into_owned(self) -> PropertyRef<'static> {
        PropertyRef {
            index: self.index,
            class: Cow::Owned(self.class.into_owned()),
            name: Cow::Owned(self.name.into_owned()),
            value_type: Cow::Owned(self.value_type.into_owned()),
        }
    }
}

/// A deferred buffer as delivered to a constructor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum BufferPayload {
    /// Fetched and decompressed.
    Loaded(Vec<u8>),
    /// Left in the container; fetch on demand.
    Deferred(BufferHandle),
}

/// One opcode of an object body with every index resolved.
///
/// Borrowed variants point into the container or its tables; use
/// [`ResolvedOpcode::into_owned`] to keep an opcode past the visit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ResolvedOpcode<'a> {
    /// Start of a skippable region; `end` is the body offset its label marks.
    SkipHeader { end: usize },
    /// The body reached the end of the innermost open region.
    SkipLabel,
    Property(PropertyRef<'a>),
    /// Raw bytes with the width of their length prefix (1, 2 or 4).
    DataBlock { width: u8, bytes: Cow<'a, [u8]> },
    DataTypeRef(Cow<'a, str>),
    DataName(Cow<'a, str>),
    DataObjectPointer(Option<ExportIndex>),
    DataResourceRef(Option<ResourceKey>),
    DataAdaptiveNumber(i32),
    DataInlineBuffer(Cow<'a, [u8]>),
    DataDeferredBuffer(BufferPayload),
}

impl ResolvedOpcode<'_> {
    pub fn into_owned(self) -> ResolvedOpcode<'static> {
        match self {
            Self::SkipHeader { end } => ResolvedOpcode::SkipHeader { end },
            Self::SkipLabel => ResolvedOpcode::SkipLabel,
            Self::Property(p) => ResolvedOpcode::Property(p.into_owned()),
            Self::DataBlock { width, bytes } => ResolvedOpcode::DataBlock {
                width,
                bytes: Cow::Owned(bytes.into_owned()),
            },
            Self::DataTypeRef(t) => ResolvedOpcode::DataTypeRef(Cow::Owned(t.into_owned())),
            Self::DataName(n) => ResolvedOpcode::DataName(Cow::Owned(n.into_owned())),
            Self::DataObjectPointer(p) => ResolvedOpcode::DataObjectPointer(p),
            Self::DataResourceRef(r) => ResolvedOpcode::DataResourceRef(r),
            Self::DataAdaptiveNumber(v) => ResolvedOpcode::DataAdaptiveNumber(v),
            Self::DataInlineBuffer(b) => {
                ResolvedOpcode::DataInlineBuffer(Cow::Owned(b.into_owned()))
            }
            Self::DataDeferredBuffer(b) => ResolvedOpcode::DataDeferredBuffer(b),
        }
    }
}
