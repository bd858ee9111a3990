//! Append-only, randomly readable byte storage.
//!
//! - [`Buffer`] - memory-then-file store with a hard size ceiling
//!
//! Buffers are created by [`crate::BufferFactory`] and owned by a branching
//! trunk; nothing else appends to them.

mod file;
mod store;

pub use store::Buffer;
