/// CRC32 of a byte range. Used for the header, every chunk and every export body.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// One-shot 64-bit checksum of a buffer payload.
pub fn checksum64(data: &[u8]) -> u64 {
    let mut rolling = RollingChecksum::BUFFER;
    rolling.update(data);
    rolling.finish()
}

/// Domain-separated, incrementally updated 64-bit checksum.
///
/// Wraps a BLAKE3 hasher in key-derivation mode, with the domain as its
/// context string, and truncates the digest to its first eight bytes.
/// Feeding the same bytes in different chunk sizes yields the same value, so a
/// writer that updates on every flush agrees with a reader that hashes the
/// whole region at once.
#[derive(Clone)]
pub struct RollingChecksum {
    domain: &'static str,
    hasher: Option<blake3::Hasher>,
    hashed: u64,
}

impl RollingChecksum {
    /// Checksum of a container's object-data or buffer-data region.
    pub const REGION: Self = Self::new("gpak-region-v1");
    /// Key of a single buffer payload.
    pub const BUFFER: Self = Self::new("gpak-buffer-v1");

    pub const fn new(domain: &'static str) -> Self {
        Self {
            domain,
            hasher: None,
            hashed: 0,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        let domain = self.domain;
        let hasher = self
            .hasher
            .get_or_insert_with(|| blake3::Hasher::new_derive_key(domain));
        hasher.update(data);
        self.hashed += data.len() as u64;
    }

    /// Current 64-bit value. Does not reset the state.
    pub fn finish(&self) -> u64 {
        let digest = match &self.hasher {
            Some(hasher) => hasher.finalize(),
            None => blake3::Hasher::new_derive_key(self.domain).finalize(),
        };
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    /// Total bytes fed so far.
    pub fn bytes_hashed(&self) -> u64 {
        self.hashed
    }

    pub fn domain(&self) -> &str {
        self.domain
    }
}

impl std::fmt::Debug for RollingChecksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingChecksum")
            .field("domain", &self.domain)
            .field("hashed", &self.hashed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_matches_known_vector() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn chunking_does_not_change_checksum() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

        let mut whole = RollingChecksum::REGION;
        whole.update(&data);

        let mut pieces = RollingChecksum::REGION;
        for chunk in data.chunks(97) {
            pieces.update(chunk);
        }

        assert_eq!(whole.finish(), pieces.finish());
        assert_eq!(pieces.bytes_hashed(), data.len() as u64);
    }

    #[test]
    fn domains_are_separated() {
        let mut region = RollingChecksum::REGION;
        region.update(b"payload");
        assert_ne!(region.finish(), checksum64(b"payload"));
    }

    #[test]
    fn checksum64_is_truncated_derive_key_hash() {
        let mut hasher = blake3::Hasher::new_derive_key("gpak-buffer-v1");
        hasher.update(b"abc");
        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        assert_eq!(checksum64(b"abc"), u64::from_le_bytes(head));
    }

    #[test]
    fn empty_checksum_is_stable() {
        let a = RollingChecksum::REGION;
        let mut b = RollingChecksum::REGION;
        b.update(&[]);
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn checksum64_distinguishes_payloads() {
        assert_eq!(checksum64(b"abc"), checksum64(b"abc"));
        assert_ne!(checksum64(b"abc"), checksum64(b"abd"));
    }
}
