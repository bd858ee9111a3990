//! Text view over a branch of an entity.

use std::io::{BufRead, BufReader};

use super::content_type::Charset;
use crate::branch::Branch;
use crate::error::BodyResult;
use crate::util::drain;

/// Reads an entity's content as text in a given charset.
///
/// The reader owns its own branch: reading it never moves the entity, and
/// dropping it closes the branch.
#[derive(Debug)]
pub struct ContentReader {
    inner: BufReader<Branch>,
    charset: Charset,
}

impl ContentReader {
    pub(crate) fn new(branch: Branch, charset: Charset) -> Self {
        Self {
            inner: BufReader::new(branch),
            charset,
        }
    }

    /// The charset text is decoded with.
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Reads and decodes everything that is left.
    ///
    /// # Errors
    ///
    /// Returns [`crate::BodyError::Decode`] if the content is not valid in
    /// the reader's charset, or any error raised by the underlying branch.
    pub fn read_to_string(&mut self) -> BodyResult<String> {
        let bytes = drain(&mut self.inner)?;
        self.charset.decode(&bytes)
    }

    /// Reads one line (including its `\n`, if any) and appends it to `buf`.
    ///
    /// Returns the number of bytes consumed; zero means end of content.
    pub fn read_line(&mut self, buf: &mut String) -> BodyResult<usize> {
        let mut raw = Vec::new();
        let n = self.inner.read_until(b'\n', &mut raw)?;
        buf.push_str(&self.charset.decode(&raw)?);
        Ok(n)
    }

    /// Returns the underlying branch, dropping anything buffered in the reader.
    pub fn into_inner(self) -> Branch {
        self.inner.into_inner()
    }
}
