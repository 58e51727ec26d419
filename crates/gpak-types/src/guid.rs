use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Global identifier of a resource that lives outside a container.
///
/// Stored on disk as four native-endian `u32` words. The all-zero guid is the
/// null identifier: an import keyed by it always collapses to "no import".
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Guid([u32; 4]);

impl Guid {
    /// Create a guid from its four words.
    pub const fn from_words(words: [u32; 4]) -> Self {
        Self(words)
    }

    /// The null guid (all zeros).
    pub const fn null() -> Self {
        Self([0; 4])
    }

    /// Returns `true` if every word is zero.
    pub fn is_null(&self) -> bool {
        self.0 == [0; 4]
    }

    /// The four words.
    pub fn words(&self) -> [u32; 4] {
        self.0
    }

    /// Big-endian byte form, used for hex rendering.
    pub fn to_be_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.0) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        out
    }

    /// Hex-encoded string representation (32 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_be_bytes())
    }

    /// Parse from a 32-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 16 {
            return Err(TypeError::InvalidLength {
                expected: 16,
                actual: bytes.len(),
            });
        }
        let mut words = [0u32; 4];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(Self(words))
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self.to_hex())
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u32; 4]> for Guid {
    fn from(words: [u32; 4]) -> Self {
        Self(words)
    }
}
