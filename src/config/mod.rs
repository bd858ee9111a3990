//! Buffer configuration.
//!
//! [`BufferFactory`] carries the thresholds every branching buffer is built
//! with. It is plain, immutable configuration: each call to
//! [`BufferFactory::new_instance`] hands out a fresh, empty [`Buffer`].
//!
//! # Example
//!
//! ```
//! use trunkrs::BufferFactory;
//!
//! // Custom thresholds
//! let factory = BufferFactory::new(4096, 32 * 1024, 512 * 1024)?;
//!
//! // Spill to a dedicated directory
//! let factory = BufferFactory::default().with_directory("/var/tmp/gateway");
//!
//! # Ok::<(), trunkrs::BodyError>(())
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::buffer::Buffer;
use crate::error::BodyError;

/// Default initial capacity of the in-memory backing (8 KiB).
pub const DEFAULT_INITIAL_LENGTH: usize = 8 * 1024;

/// Default size at which a buffer spills to disk (64 KiB).
pub const DEFAULT_MEMORY_LIMIT: usize = 64 * 1024;

/// Default hard ceiling of a buffer (1 MiB).
pub const DEFAULT_FILE_LIMIT: usize = 1024 * 1024;

/// Produces [`Buffer`]s with fixed size thresholds.
///
/// - `initial_length` - capacity reserved up front for the memory backing
/// - `memory_limit` - once content would grow past this, the buffer moves to a
///   temporary file
/// - `file_limit` - content may never grow past this; appends that would are
///   rejected with [`BodyError::Overflow`]
/// - `directory` - where temporary files go (`None` means the OS temp dir)
///
/// # Size Constraints
///
/// All sizes must be non-zero and ordered:
/// `initial_length <= memory_limit <= file_limit`.
///
/// # Example
///
/// ```
/// use trunkrs::BufferFactory;
///
/// let factory = BufferFactory::default()
///     .with_memory_limit(16 * 1024)
///     .with_file_limit(256 * 1024);
/// assert!(factory.validate().is_ok());
///
/// let buffer = factory.new_instance();
/// assert_eq!(buffer.len(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BufferFactory {
    directory: Option<PathBuf>,
    initial_length: usize,
    memory_limit: usize,
    file_limit: usize,
}

impl BufferFactory {
    /// Creates a factory with the given thresholds and no spill directory.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::InvalidConfig`] if:
    /// - Any size is zero
    /// - `initial_length > memory_limit` or `memory_limit > file_limit`
    pub fn new(
        initial_length: usize,
        memory_limit: usize,
        file_limit: usize,
    ) -> Result<Self, BodyError> {
        if initial_length == 0 || memory_limit == 0 || file_limit == 0 {
            return Err(BodyError::InvalidConfig {
                message: "buffer sizes must be non-zero",
            });
        }

        if initial_length > memory_limit {
            return Err(BodyError::InvalidConfig {
                message: "initial_length cannot be greater than memory_limit",
            });
        }

        if memory_limit > file_limit {
            return Err(BodyError::InvalidConfig {
                message: "memory_limit cannot be greater than file_limit",
            });
        }

        Ok(Self {
            directory: None,
            initial_length,
            memory_limit,
            file_limit,
        })
    }

    /// Sets the initial in-memory capacity.
    ///
    /// Note: This does not validate the configuration. Use
    /// [`BufferFactory::validate`] to check it.
    pub fn with_initial_length(mut self, size: usize) -> Self {
        self.initial_length = size;
        self
    }

    /// Sets the spill-to-disk threshold.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_memory_limit(mut self, size: usize) -> Self {
        self.memory_limit = size;
        self
    }

    /// Sets the hard ceiling.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_file_limit(mut self, size: usize) -> Self {
        self.file_limit = size;
        self
    }

    /// Sets the directory temporary files are created in.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Returns the spill directory, if one is configured.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Returns the initial in-memory capacity.
    pub fn initial_length(&self) -> usize {
        self.initial_length
    }

    /// Returns the spill-to-disk threshold.
    pub fn memory_limit(&self) -> usize {
        self.memory_limit
    }

    /// Returns the hard ceiling.
    pub fn file_limit(&self) -> usize {
        self.file_limit
    }

    /// Validates the current configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use trunkrs::BufferFactory;
    ///
    /// let factory = BufferFactory::default().with_memory_limit(0);
    /// assert!(factory.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), BodyError> {
        Self::new(self.initial_length, self.memory_limit, self.file_limit).map(|_| ())
    }

    /// Returns a fresh, empty, memory-backed buffer.
    pub fn new_instance(&self) -> Buffer {
        Buffer::new(
            self.directory.clone(),
            self.initial_length,
            self.memory_limit,
            self.file_limit,
        )
    }
}

impl Default for BufferFactory {
    fn default() -> Self {
        Self {
            directory: None,
            initial_length: DEFAULT_INITIAL_LENGTH,
            memory_limit: DEFAULT_MEMORY_LIMIT,
            file_limit: DEFAULT_FILE_LIMIT,
        }
    }
}
