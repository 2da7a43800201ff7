// crates/verity-core/src/crypto.rs

use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of the given bytes.
///
/// Returns a 32-byte hash.
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Incremental SHA-256 over length-prefixed fields.
///
/// Every variable-length field is written as a big-endian u64 length
/// followed by its bytes, so adjacent fields can never be confused
/// ("ab" + "c" hashes differently from "a" + "bc").
pub struct FieldHasher {
    inner: Sha256,
}

impl FieldHasher {
    /// Start a digest under a domain-separation tag.
    pub fn new(domain: &str) -> Self {
        let mut hasher = Self {
            inner: Sha256::new(),
        };
        hasher.bytes(domain.as_bytes());
        hasher
    }

    pub fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update((data.len() as u64).to_be_bytes());
        self.inner.update(data);
        self
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.inner.update([value]);
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.inner.update(value.to_be_bytes());
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.inner.update(value.to_be_bytes());
        self
    }

    pub fn i64(&mut self, value: i64) -> &mut Self {
        self.inner.update(value.to_be_bytes());
        self
    }

    pub fn f64(&mut self, value: f64) -> &mut Self {
        self.inner.update(value.to_bits().to_be_bytes());
        self
    }

    pub fn finish(self) -> [u8; 32] {
        self.inner.finalize().into()
    }
}
