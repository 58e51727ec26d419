use gpak_tables::ValidationConfig;
use gpak_types::LoadMode;
use serde::{Deserialize, Serialize};

use crate::error::{LoadError, LoadResult};

const MIB: u64 = 1024 * 1024;

/// Upper bounds checked against on-disk lengths before anything is
/// allocated or copied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityLimits {
    pub max_block_len: u64,
    pub max_inline_buffer_len: u64,
    /// Applies to both the stored and the uncompressed size.
    pub max_buffer_len: u64,
    pub max_skip_depth: usize,
}

impl Default for CapacityLimits {
    fn default() -> Self {
        Self {
            max_block_len: 16 * MIB,
            max_inline_buffer_len: 16 * MIB,
            max_buffer_len: 256 * MIB,
            max_skip_depth: 256,
        }
    }
}

impl CapacityLimits {
    pub(crate) fn check(&self, what: &'static str, len: u64, max: u64) -> LoadResult<()> {
        if len > max {
            return Err(LoadError::Capacity { what, len, max });
        }
        Ok(())
    }
}

/// Loader configuration.
///
/// Every field has a default, so a TOML file only names what it changes:
///
/// ```toml
/// mode = "no-buffers"
///
/// [validation]
/// verify_chunk_checksums = false
///
/// [limits]
/// max_skip_depth = 64
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub mode: LoadMode,
    pub validation: ValidationConfig,
    pub limits: CapacityLimits,
}

impl LoadConfig {
    pub fn with_mode(mode: LoadMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn from_toml_str(source: &str) -> LoadResult<Self> {
        toml::from_str(source).map_err(|e| LoadError::InvalidConfig(e.to_string()))
    }

    pub fn to_toml_string(&self) -> LoadResult<String> {
        toml::to_string(self).map_err(|e| LoadError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_verify_everything() {
        let config = LoadConfig::default();
        assert_eq!(config.mode, LoadMode::Full);
        assert!(config.validation.verify_chunk_checksums);
        assert!(config.validation.verify_data_checksums);
        assert_eq!(config.limits.max_buffer_len, 256 * MIB);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = LoadConfig::from_toml_str(
            r#"
            mode = "no-buffers"

            [validation]
            verify_chunk_checksums = false

            [limits]
            max_skip_depth = 64
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, LoadMode::NoBuffers);
        assert!(!config.validation.verify_chunk_checksums);
        assert!(config.validation.verify_data_checksums);
        assert_eq!(config.limits.max_skip_depth, 64);
        assert_eq!(config.limits.max_block_len, 16 * MIB);
    }

    #[test]
    fn toml_roundtrip() {
        let config = LoadConfig {
            mode: LoadMode::DependenciesOnly,
            validation: ValidationConfig::release(),
            limits: CapacityLimits::default(),
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(LoadConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn bad_toml_is_reported() {
        assert!(matches!(
            LoadConfig::from_toml_str("mode = \"sideways\""),
            Err(LoadError::InvalidConfig(_))
        ));
    }
}
