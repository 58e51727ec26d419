use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Compression tag recorded for a buffer payload.
///
/// The container only stores the tag; codecs live behind the `BufferCodec`
/// trait. Unknown tags survive a load untouched as [`CompressionType::Custom`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompressionType {
    #[default]
    None,
    Zstd,
    Custom(u8),
}

impl CompressionType {
    /// Serialize to the on-disk tag byte.
    pub fn tag(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Zstd => 1,
            Self::Custom(tag) => *tag,
        }
    }

    /// Parse from the on-disk tag byte. Never fails.
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0 => Self::None,
            1 => Self::Zstd,
            other => Self::Custom(other),
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Zstd => write!(f, "zstd"),
            Self::Custom(tag) => write!(f, "custom({tag})"),
        }
    }
}

/// Location and shape of one buffer payload.
///
/// This is the metadata a buffer factory needs to start a fetch. It is
/// `Copy` and never mutated after the tables are loaded, so it can be handed
/// to any number of concurrent loaders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferInfo {
    /// 64-bit checksum of the uncompressed payload; the deferred-reference key.
    pub checksum: u64,
    /// Absolute offset of the stored bytes from the container start.
    pub file_offset: u64,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub compression: CompressionType,
}

/// How deep a loader walks a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadMode {
    /// Objects and buffer payloads.
    #[default]
    Full,
    /// Only enough to enumerate referenced imports.
    DependenciesOnly,
    /// Objects fully resolved, buffer payloads left as deferred handles.
    NoBuffers,
}

impl FromStr for LoadMode {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "dependencies" | "dependencies-only" | "deps" => Ok(Self::DependenciesOnly),
            "no-buffers" => Ok(Self::NoBuffers),
            other => Err(TypeError::UnknownLoadMode(other.to_string())),
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::DependenciesOnly => write!(f, "dependencies-only"),
            Self::NoBuffers => write!(f, "no-buffers"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_tag_roundtrip() {
        for tag in [0u8, 1, 2, 200, 255] {
            assert_eq!(CompressionType::from_tag(tag).tag(), tag);
        }
        assert_eq!(CompressionType::from_tag(1), CompressionType::Zstd);
        assert_eq!(CompressionType::from_tag(9), CompressionType::Custom(9));
    }

    #[test]
    fn load_mode_parse() {
        assert_eq!("full".parse::<LoadMode>().unwrap(), LoadMode::Full);
        assert_eq!("deps".parse::<LoadMode>().unwrap(), LoadMode::DependenciesOnly);
        assert_eq!("no-buffers".parse::<LoadMode>().unwrap(), LoadMode::NoBuffers);
        assert!("everything".parse::<LoadMode>().is_err());
    }

    #[test]
    fn load_mode_display_parses_back() {
        for mode in [LoadMode::Full, LoadMode::DependenciesOnly, LoadMode::NoBuffers] {
            assert_eq!(mode.to_string().parse::<LoadMode>().unwrap(), mode);
        }
    }

    #[test]
    fn load_mode_serde_is_kebab_case() {
        let json = serde_json::to_string(&LoadMode::NoBuffers).unwrap();
        assert_eq!(json, "\"no-buffers\"");
    }
}
