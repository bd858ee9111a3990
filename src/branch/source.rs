//! Physical byte sources a trunk can wrap.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

use crate::util::discard;

/// A physical byte source.
///
/// Beyond [`Read`], a source may offer a cheaper way to skip bytes, a hint of
/// how many bytes can be read without blocking, and a hook that runs when the
/// last branch over it is closed. The defaults read-and-discard, report
/// nothing available, and do nothing on close.
pub trait ByteSource: Read {
    /// Skips up to `n` bytes, returning how many were skipped.
    fn skip(&mut self, n: u64) -> io::Result<u64> {
        discard(self, n)
    }

    /// Bytes readable without blocking (a hint; zero means unknown).
    fn available(&self) -> u64 {
        0
    }

    /// Releases the source. Called exactly once, by the owning trunk.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: AsRef<[u8]>> ByteSource for Cursor<T> {
    fn skip(&mut self, n: u64) -> io::Result<u64> {
        let skipped = n.min(self.available());
        self.set_position(self.position() + skipped);
        Ok(skipped)
    }

    fn available(&self) -> u64 {
        let len = self.get_ref().as_ref().len() as u64;
        len.saturating_sub(self.position())
    }
}

impl ByteSource for File {
    fn skip(&mut self, n: u64) -> io::Result<u64> {
        // pipes and devices report no length; only regular files can seek
        if !self.metadata()?.is_file() {
            return discard(self, n);
        }
        let current = self.stream_position()?;
        let end = self.metadata()?.len();
        let skipped = n.min(end.saturating_sub(current));
        self.seek(SeekFrom::Current(skipped as i64))?;
        Ok(skipped)
    }
}

/// A source with no content. Entities start out with one.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

impl Read for EmptySource {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }
}

impl ByteSource for EmptySource {
    fn skip(&mut self, _n: u64) -> io::Result<u64> {
        Ok(0)
    }
}

/// Adapts any [`Read`] into a [`ByteSource`] with the default hooks.
///
/// # Example
///
/// ```
/// use std::io::Read;
/// use trunkrs::{Branch, BufferFactory, ReaderSource};
///
/// let reader = std::io::repeat(b'x').take(4);
/// let mut branch = Branch::wrap(ReaderSource::new(reader), BufferFactory::default());
///
/// let mut out = String::new();
/// branch.read_to_string(&mut out)?;
/// assert_eq!(out, "xxxx");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct ReaderSource<R> {
    inner: R,
}

impl<R: Read> ReaderSource<R> {
    /// Wraps a reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for ReaderSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {}
