//! The Buffer type - shared storage behind diverging branches.

use std::path::{Path, PathBuf};

use bytes::BytesMut;
use tracing::{debug, warn};

use super::file::FileBacking;
use crate::error::{BodyError, BodyResult};

/// Where the bytes currently live.
#[derive(Debug)]
enum Backing {
    Memory(BytesMut),
    File(FileBacking),
    Closed,
}

/// An append-only byte store that any number of readers can read from.
///
/// Content starts in memory. An append that would take it past the memory
/// limit moves everything into a temporary file, after which the buffer stays
/// file-backed. An append that would take it past the file limit fails with
/// [`BodyError::Overflow`] and leaves the buffer untouched.
///
/// # Example
///
/// ```
/// use trunkrs::BufferFactory;
///
/// let mut buffer = BufferFactory::new(4, 8, 16)?.new_instance();
/// buffer.append(b"0123456789")?; // past 8 bytes: now file-backed
/// assert!(buffer.is_file_backed());
///
/// let mut out = [0u8; 4];
/// assert_eq!(buffer.read(6, &mut out)?, 4);
/// assert_eq!(&out, b"6789");
///
/// assert!(buffer.append(&[0u8; 7]).is_err()); // 17 > 16
/// assert_eq!(buffer.len(), 10);
/// # Ok::<(), trunkrs::BodyError>(())
/// ```
#[derive(Debug)]
pub struct Buffer {
    backing: Backing,
    directory: Option<PathBuf>,
    memory_limit: usize,
    file_limit: usize,
}

impl Buffer {
    pub(crate) fn new(
        directory: Option<PathBuf>,
        initial_length: usize,
        memory_limit: usize,
        file_limit: usize,
    ) -> Self {
        Self {
            backing: Backing::Memory(BytesMut::with_capacity(initial_length)),
            directory,
            memory_limit,
            file_limit,
        }
    }

    /// Appends bytes to the end of the buffer.
    ///
    /// # Errors
    ///
    /// - [`BodyError::Overflow`] if the result would exceed the file limit
    /// - [`BodyError::ClosedStream`] if the buffer was closed
    /// - [`BodyError::Io`] if the temporary file cannot be created or written
    pub fn append(&mut self, data: &[u8]) -> BodyResult<()> {
        if matches!(self.backing, Backing::Closed) {
            return Err(BodyError::ClosedStream);
        }

        let new_len = self.len().saturating_add(data.len());
        if new_len > self.file_limit {
            warn!(
                length = self.len(),
                append = data.len(),
                limit = self.file_limit,
                "buffer limit exceeded"
            );
            return Err(BodyError::Overflow {
                limit: self.file_limit,
            });
        }

        if let Backing::Memory(mem) = &self.backing {
            if new_len > self.memory_limit {
                let file = FileBacking::create(self.directory.as_deref(), mem)?;
                debug!(
                    length = mem.len(),
                    path = %file.path().display(),
                    "buffer spilled to file"
                );
                self.backing = Backing::File(file);
            }
        }

        match &mut self.backing {
            Backing::Memory(mem) => mem.extend_from_slice(data),
            Backing::File(file) => file.append(data)?,
            Backing::Closed => return Err(BodyError::ClosedStream),
        }
        Ok(())
    }

    /// Copies bytes starting at `position` into `out` without consuming them.
    ///
    /// Returns the number of bytes copied, which is less than `out.len()`
    /// only when the end of the content is reached (and zero at or past it).
    pub fn read(&mut self, position: usize, out: &mut [u8]) -> BodyResult<usize> {
        let available = self.len().saturating_sub(position);
        let n = out.len().min(available);
        match &mut self.backing {
            Backing::Closed => return Err(BodyError::ClosedStream),
            _ if n == 0 => {}
            Backing::Memory(mem) => out[..n].copy_from_slice(&mem[position..position + n]),
            Backing::File(file) => file.read_at(position, &mut out[..n])?,
        }
        Ok(n)
    }

    /// Total bytes appended so far.
    pub fn len(&self) -> usize {
        match &self.backing {
            Backing::Memory(mem) => mem.len(),
            Backing::File(file) => file.len(),
            Backing::Closed => 0,
        }
    }

    /// Returns true if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once content has spilled to a temporary file.
    pub fn is_file_backed(&self) -> bool {
        matches!(self.backing, Backing::File(_))
    }

    /// Path of the temporary file, while file-backed.
    pub fn file_path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::File(file) => Some(file.path()),
            _ => None,
        }
    }

    /// Releases memory and deletes any temporary file. Idempotent.
    pub fn close(&mut self) -> BodyResult<()> {
        match std::mem::replace(&mut self.backing, Backing::Closed) {
            Backing::File(file) => file.close()?,
            Backing::Memory(_) | Backing::Closed => {}
        }
        Ok(())
    }
}
