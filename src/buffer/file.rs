//! Temporary-file backing used once a buffer outgrows its memory limit.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// An append-only region of a temporary file.
///
/// The file is removed when the backing is closed or dropped. Every write
/// seeks to the recorded length first, so a failed append never moves the
/// logical end of the content.
#[derive(Debug)]
pub(crate) struct FileBacking {
    file: NamedTempFile,
    length: usize,
}

impl FileBacking {
    /// Creates a temporary file (under `directory` if given) holding `initial`.
    pub(crate) fn create(directory: Option<&Path>, initial: &[u8]) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(".trunkrs-").suffix(".buf");
        let file = match directory {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        let mut backing = Self { file, length: 0 };
        backing.append(initial)?;
        Ok(backing)
    }

    pub(crate) fn len(&self) -> usize {
        self.length
    }

    pub(crate) fn path(&self) -> &Path {
        self.file.path()
    }

    pub(crate) fn append(&mut self, data: &[u8]) -> io::Result<()> {
        let file = self.file.as_file_mut();
        file.seek(SeekFrom::Start(self.length as u64))?;
        file.write_all(data)?;
        self.length += data.len();
        Ok(())
    }

    /// Fills `out` from `position`; the caller bounds `out` to stored content.
    pub(crate) fn read_at(&mut self, position: usize, out: &mut [u8]) -> io::Result<()> {
        let file = self.file.as_file_mut();
        file.seek(SeekFrom::Start(position as u64))?;
        file.read_exact(out)
    }

    /// Deletes the file, reporting any failure to do so.
    pub(crate) fn close(self) -> io::Result<()> {
        self.file.close()
    }
}
