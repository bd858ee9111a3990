//! Internal utility functions and helpers.
//!
//! This module contains small helper functions used throughout the crate.
//! It is an implementation detail and not part of the public API.

use std::io::{self, ErrorKind, Read};

use bytes::{Bytes, BytesMut};

/// Scratch size for read-and-discard and drain loops.
pub(crate) const SCRATCH_SIZE: usize = 8 * 1024;

/// Reads and throws away up to `n` bytes, returning how many were consumed.
pub(crate) fn discard<R: Read + ?Sized>(reader: &mut R, n: u64) -> io::Result<u64> {
    let mut scratch = [0u8; SCRATCH_SIZE];
    let mut remaining = n;
    while remaining > 0 {
        let want = remaining.min(SCRATCH_SIZE as u64) as usize;
        match reader.read(&mut scratch[..want]) {
            Ok(0) => break,
            Ok(k) => remaining -= k as u64,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(n - remaining)
}

/// Reads everything left in `reader` into a single [`Bytes`].
pub(crate) fn drain<R: Read + ?Sized>(reader: &mut R) -> io::Result<Bytes> {
    let mut out = BytesMut::new();
    let mut scratch = [0u8; SCRATCH_SIZE];
    loop {
        match reader.read(&mut scratch) {
            Ok(0) => return Ok(out.freeze()),
            Ok(k) => out.extend_from_slice(&scratch[..k]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
