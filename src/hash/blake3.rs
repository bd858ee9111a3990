//! BLAKE3-based content hashing.

use super::ContentDigest;

/// Streaming BLAKE3 over body bytes.
#[derive(Debug, Clone, Default)]
pub(crate) struct Blake3Hasher {
    state: blake3::Hasher,
}

impl Blake3Hasher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    pub(crate) fn finalize(&self) -> ContentDigest {
        ContentDigest::new(self.state.finalize().into())
    }

    /// One-shot digest of `data`.
    #[cfg(test)]
    pub(crate) fn hash(data: &[u8]) -> ContentDigest {
        ContentDigest::new(blake3::hash(data).into())
    }
}
