use std::fmt;

use serde::{Deserialize, Serialize};

use crate::guid::Guid;

/// Symbolic reference to a resource stored outside the container.
///
/// `class` names the type the resource is expected to have. A key whose guid
/// is null is the empty reference and always interns to import index 0.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub class: String,
    pub guid: Guid,
}

impl ResourceKey {
    pub fn new(class: impl Into<String>, guid: Guid) -> Self {
        Self {
            class: class.into(),
            guid,
        }
    }

    /// The empty reference.
    pub fn null() -> Self {
        Self {
            class: String::new(),
            guid: Guid::null(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.guid.is_null()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class, self.guid)
    }
}
