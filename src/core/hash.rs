//! Commitment and Audit Hashing
//!
//! Provides deterministic SHA-256 hashing for:
//! - Seed commitments (published before play)
//! - Match audit hashes (tamper-evidence fingerprints)
//! - Prize table fingerprints

use sha2::{Digest, Sha256};

/// Hash output type (256 bits / 32 bytes)
pub type Digest32 = [u8; 32];

/// Domain separator for match audit hashes.
pub const AUDIT_DOMAIN: &[u8] = b"FAIR_ARCADE_AUDIT_V1";

/// Domain separator for prize table fingerprints.
pub const TABLE_DOMAIN: &[u8] = b"FAIR_ARCADE_TABLE_V1";

/// Deterministic hasher for audit state.
///
/// Wraps SHA-256 with typed update helpers.
/// Order of updates is critical for determinism.
pub struct AuditHasher {
    hasher: Sha256,
}

impl AuditHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for match session state.
    pub fn for_match() -> Self {
        Self::new(AUDIT_DOMAIN)
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a length-prefixed string, so adjacent fields cannot alias.
    #[inline]
    pub fn update_str(&mut self, value: &str) {
        self.update_u32(value.len() as u32);
        self.hasher.update(value.as_bytes());
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an i64 value (little-endian).
    #[inline]
    pub fn update_i64(&mut self, value: i64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> Digest32 {
        self.hasher.finalize().into()
    }

    /// Finalize and return the hash as lowercase hex.
    pub fn finalize_hex(self) -> String {
        hex::encode(self.finalize())
    }
}

/// SHA-256 of a seed string, hex encoded.
///
/// This is the public commitment for a secret seed.
pub fn commit_seed(seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_hasher_determinism() {
        let make_hash = || {
            let mut hasher = AuditHasher::for_match();
            hasher.update_str("seed");
            hasher.update_u64(120);
            hasher.update_u32(7);
            hasher.update_bool(true);
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = {
            let mut h = AuditHasher::new(b"test");
            h.update_u32(1);
            h.update_u32(2);
            h.finalize()
        };

        let hash2 = {
            let mut h = AuditHasher::new(b"test");
            h.update_u32(2);
            h.update_u32(1);
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_length_prefix_prevents_aliasing() {
        let a = {
            let mut h = AuditHasher::new(b"test");
            h.update_str("ab");
            h.update_str("c");
            h.finalize()
        };
        let b = {
            let mut h = AuditHasher::new(b"test");
            h.update_str("a");
            h.update_str("bc");
            h.finalize()
        };

        assert_ne!(a, b);
    }

    #[test]
    fn test_domain_separation() {
        let data = [1u8, 2, 3, 4];
        assert_ne!(
            {
                let mut h = AuditHasher::new(AUDIT_DOMAIN);
                h.update_bytes(&data);
                h.finalize()
            },
            {
                let mut h = AuditHasher::new(TABLE_DOMAIN);
                h.update_bytes(&data);
                h.finalize()
            }
        );
    }

    #[test]
    fn test_commit_seed_known_value() {
        // sha256("abc")
        assert_eq!(
            commit_seed("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
