//! Content digests for signing and logging collaborators.
//!
//! - [`ContentDigest`] - 32-byte digest of a body
//! - `Blake3Hasher` - streaming BLAKE3 (requires `hash-blake3` feature)

mod digest;

#[cfg(feature = "hash-blake3")]
mod blake3;

pub use digest::ContentDigest;

#[cfg(feature = "hash-blake3")]
pub(crate) use self::blake3::Blake3Hasher;
