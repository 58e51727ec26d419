//! Typed indices into the symbol tables.
//!
//! Every cross-table reference in a container is one of these newtypes rather
//! than a raw offset. They are validated once when tables are loaded; after
//! that, lookups go through bounds-checked slice access.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! table_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn get(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn as_usize(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
    ($(#[$meta:meta])* reserved $name:ident) => {
        table_index!($(#[$meta])* $name);

        impl $name {
            /// The reserved "none" entry at index 0.
            pub const NONE: Self = Self(0);

            #[inline]
            pub const fn is_none(self) -> bool {
                self.0 == 0
            }
        }
    };
}

table_index!(
    /// Byte offset into the text chunk. Offset 0 holds the empty string.
    reserved StringIndex
);
table_index!(
    /// Index into the name table. Entry 0 is "no name".
    reserved NameIndex
);
table_index!(
    /// Index into the type table. Entry 0 is "no type".
    reserved TypeIndex
);
table_index!(
    /// Index into the property table. Entry 0 is "no property".
    reserved PropertyIndex
);
table_index!(
    /// Index into the import table. Entry 0 is "no import".
    reserved ImportIndex
);
table_index!(
    /// Index into the export table (not reserved).
    ExportIndex
);
table_index!(
    /// Index into the buffer table (not reserved).
    BufferIndex
);

impl ExportIndex {
    /// Encode as an object pointer value: `0` is null, `n` is export `n - 1`.
    pub fn to_pointer(index: Option<Self>) -> u32 {
        index.map_or(0, |i| i.0 + 1)
    }

    /// Decode an object pointer value written by [`ExportIndex::to_pointer`].
    pub fn from_pointer(raw: u32) -> Option<Self> {
        raw.checked_sub(1).map(Self)
    }
}
