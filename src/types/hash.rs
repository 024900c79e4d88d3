//! 32-byte SHA-256 hash type and incremental hashing helpers.

use crate::types::encoding::EncodeSink;
use sha2::{Digest, Sha256};
use solochain_derive::BinaryCodec;
use std::fmt;
use std::sync::Mutex;

/// Hash length in bytes.
pub const HASH_LEN: usize = 32;

/// Fixed-size 32-byte hash used throughout the chain.
///
/// `Copy` on purpose: hashes are compared and passed constantly during block
/// validation, and 32 bytes on the stack beats reference indirection.
/// The all-zero hash is the "unset" sentinel (genesis predecessor, fresh
/// caches).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, BinaryCodec)]
pub struct Hash(pub [u8; HASH_LEN]);

impl Hash {
    /// The zero hash, used as the "unset" sentinel.
    pub const fn zero() -> Hash {
        Hash([0u8; HASH_LEN])
    }

    pub const fn is_zero(&self) -> bool {
        let mut i = 0;
        while i < HASH_LEN {
            if self.0[i] != 0 {
                return false;
            }
            i += 1;
        }
        true
    }

    pub const fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Builds a hash from a slice; `None` unless it is exactly 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Hash> {
        if slice.len() != HASH_LEN {
            return None;
        }
        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(slice);
        Some(Hash(bytes))
    }

    /// One-shot SHA-256 over a byte slice.
    pub fn sha256(data: &[u8]) -> Hash {
        Hash(Sha256::digest(data).into())
    }

    /// Incremental SHA-256 builder.
    pub fn builder() -> HashBuilder {
        HashBuilder::new()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Incremental SHA-256 hasher.
///
/// Implements [`EncodeSink`] so encodable values can be hashed directly,
/// without serializing into an intermediate buffer first.
pub struct HashBuilder {
    hasher: Sha256,
}

impl HashBuilder {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    pub fn finalize(self) -> Hash {
        Hash(self.hasher.finalize().into())
    }
}

impl Default for HashBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeSink for HashBuilder {
    fn write(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }
}

/// Interior-mutable single-initialization hash cell.
///
/// Blocks and transactions are immutable once built, so their hash is
/// computed at most once and memoized here. The cache never participates in
/// value identity: it compares equal to any other cache and encodes to
/// nothing, so codec round-trips simply start with a fresh cell.
#[derive(Debug)]
pub struct HashCache {
    cached: Mutex<Option<Hash>>,
}

impl HashCache {
    pub fn new() -> Self {
        Self {
            cached: Mutex::new(None),
        }
    }

    /// Returns the cached hash, computing it via `f` on first use.
    pub fn get_or_compute(&self, f: impl FnOnce() -> Hash) -> Hash {
        let mut guard = self.cached.lock().unwrap();
        match *guard {
            Some(hash) => hash,
            None => {
                let hash = f();
                *guard = Some(hash);
                hash
            }
        }
    }

    /// Returns the cached hash without computing.
    pub fn get(&self) -> Option<Hash> {
        *self.cached.lock().unwrap()
    }
}

impl Default for HashCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for HashCache {
    fn clone(&self) -> Self {
        HashCache {
            cached: Mutex::new(*self.cached.lock().unwrap()),
        }
    }
}

// The cache is derived state, not value state.
impl PartialEq for HashCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for HashCache {}

impl crate::types::encoding::Encode for HashCache {
    fn encode<S: EncodeSink>(&self, _out: &mut S) {}
}

impl crate::types::encoding::Decode for HashCache {
    fn decode(_input: &mut &[u8]) -> Result<Self, crate::types::encoding::DecodeError> {
        Ok(HashCache::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::encoding::{Decode, Encode};

    #[test]
    fn zero_hash_is_sentinel() {
        assert!(Hash::zero().is_zero());
        assert!(!Hash::sha256(b"x").is_zero());
    }

    #[test]
    fn display_is_lowercase_hex() {
        let hash = Hash::sha256(b"abc");
        let text = hash.to_string();
        assert_eq!(text.len(), 64);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit()));
        // Known SHA-256 vector for "abc".
        assert!(text.starts_with("ba7816bf"));
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(Hash::from_slice(&[0u8; 31]).is_none());
        assert!(Hash::from_slice(&[0u8; 33]).is_none());
        assert_eq!(Hash::from_slice(&[0u8; 32]), Some(Hash::zero()));
    }

    #[test]
    fn builder_matches_one_shot() {
        let mut builder = Hash::builder();
        builder.update(b"foo");
        builder.update(b"bar");
        assert_eq!(builder.finalize(), Hash::sha256(b"foobar"));
    }

    #[test]
    fn codec_roundtrip() {
        let hash = Hash::sha256(b"roundtrip");
        let decoded = Hash::from_bytes(&hash.to_bytes()).unwrap();
        assert_eq!(hash, decoded);
    }

    #[test]
    fn cache_computes_once() {
        let cache = HashCache::new();
        let mut calls = 0;

        let first = cache.get_or_compute(|| {
            calls += 1;
            Hash::sha256(b"value")
        });
        let second = cache.get_or_compute(|| {
            calls += 1;
            Hash::sha256(b"other")
        });

        assert_eq!(calls, 1);
        assert_eq!(first, second);
    }

    #[test]
    fn cache_get_without_compute() {
        let cache = HashCache::new();
        assert!(cache.get().is_none());
        cache.get_or_compute(|| Hash::sha256(b"v"));
        assert_eq!(cache.get(), Some(Hash::sha256(b"v")));
    }

    #[test]
    fn cache_clone_keeps_value() {
        let cache = HashCache::new();
        cache.get_or_compute(|| Hash::sha256(b"v"));
        assert_eq!(cache.clone().get(), Some(Hash::sha256(b"v")));
    }

    #[test]
    fn cache_encodes_to_nothing() {
        let cache = HashCache::new();
        cache.get_or_compute(|| Hash::sha256(b"v"));
        assert!(cache.to_bytes().is_empty());

        let decoded = HashCache::from_bytes(&[]).unwrap();
        assert!(decoded.get().is_none());
    }
}
