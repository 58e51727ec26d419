use gpak_types::CompressionType;

use crate::error::{CodecError, CodecResult};

/// Compression collaborator for buffer payloads.
///
/// The container records only the [`CompressionType`] tag and both sizes;
/// implementations decide which tags they understand.
pub trait BufferCodec: Send + Sync {
    fn compress(&self, kind: CompressionType, data: &[u8]) -> CodecResult<Vec<u8>>;

    /// Decompress `data`, which must expand to exactly `uncompressed_size` bytes.
    fn decompress(
        &self,
        kind: CompressionType,
        data: &[u8],
        uncompressed_size: usize,
    ) -> CodecResult<Vec<u8>>;
}

/// Codec for [`CompressionType::None`] and [`CompressionType::Zstd`].
#[derive(Clone, Copy, Debug)]
pub struct StandardCodec {
    pub zstd_level: i32,
}

impl Default for StandardCodec {
    fn default() -> Self {
        Self { zstd_level: 3 }
    }
}

impl BufferCodec for StandardCodec {
    fn compress(&self, kind: CompressionType, data: &[u8]) -> CodecResult<Vec<u8>> {
        match kind {
            CompressionType::None => Ok(data.to_vec()),
            CompressionType::Zstd => zstd::encode_all(data, self.zstd_level)
                .map_err(|e| CodecError::CompressionFailed(e.to_string())),
            other => Err(CodecError::UnsupportedCompression(other)),
        }
    }

    fn decompress(
        &self,
        kind: CompressionType,
        data: &[u8],
        uncompressed_size: usize,
    ) -> CodecResult<Vec<u8>> {
        let out = match kind {
            CompressionType::None => data.to_vec(),
            // Bounded by the recorded size, never by what the stream claims.
            CompressionType::Zstd => zstd::bulk::decompress(data, uncompressed_size)
                .map_err(|e| CodecError::DecompressionFailed(e.to_string()))?,
            other => return Err(CodecError::UnsupportedCompression(other)),
        };
        if out.len() != uncompressed_size {
            return Err(CodecError::SizeMismatch {
                expected: uncompressed_size,
                actual: out.len(),
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_identity() {
        let codec = StandardCodec::default();
        let data = b"plain bytes";
        let stored = codec.compress(CompressionType::None, data).unwrap();
        assert_eq!(stored, data);
        let back = codec
            .decompress(CompressionType::None, &stored, data.len())
            .unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn zstd_roundtrip_shrinks_repetitive_data() {
        let codec = StandardCodec::default();
        let data = vec![0xABu8; 50_000];
        let stored = codec.compress(CompressionType::Zstd, &data).unwrap();
        assert!(stored.len() < data.len());
        let back = codec
            .decompress(CompressionType::Zstd, &stored, data.len())
            .unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn size_mismatch_is_reported() {
        let codec = StandardCodec::default();
        let err = codec
            .decompress(CompressionType::None, b"abc", 4)
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::SizeMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn custom_tags_are_unsupported() {
        let codec = StandardCodec::default();
        let kind = CompressionType::Custom(42);
        assert_eq!(
            codec.compress(kind, b"x").unwrap_err(),
            CodecError::UnsupportedCompression(kind)
        );
    }
}
