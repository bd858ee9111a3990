//! Shared state behind every branch of one physical source.
//!
//! The trunk is an arena: it owns the source, the lazily created [`Buffer`]
//! and a registry of live branches keyed by [`BranchId`]. Branch handles only
//! carry their id, so every read, skip and close goes through here.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, ErrorKind};

use tracing::{debug, trace, warn};

use super::source::ByteSource;
use crate::buffer::Buffer;
use crate::config::BufferFactory;
use crate::error::{BodyError, BodyResult};

/// Identity of a branch within its trunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchId(u64);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct Node {
    parent: Option<BranchId>,
    /// Offset into the shared buffer. Meaningless while there is no buffer;
    /// every live node is reset to zero when one is allocated.
    position: usize,
}

/// Why a trunk stopped serving bytes.
///
/// Bytes taken from the source but never buffered are gone, so every branch
/// fails from then on instead of reading past the gap.
#[derive(Debug, Clone, Copy)]
enum Failure {
    Overflow { limit: usize },
    Io(ErrorKind),
}

impl Failure {
    fn to_error(self) -> BodyError {
        match self {
            Self::Overflow { limit } => BodyError::Overflow { limit },
            Self::Io(kind) => BodyError::Io(io::Error::new(kind, "buffer write failed earlier")),
        }
    }
}

pub(crate) struct Trunk {
    source: Option<Box<dyn ByteSource>>,
    buffer: Option<Buffer>,
    factory: BufferFactory,
    branches: BTreeMap<BranchId, Node>,
    next_id: u64,
    failed: Option<Failure>,
}

impl Trunk {
    /// Creates a trunk over `source` together with its root branch.
    pub(crate) fn new(source: Box<dyn ByteSource>, factory: BufferFactory) -> (Self, BranchId) {
        let mut trunk = Self {
            source: Some(source),
            buffer: None,
            factory,
            branches: BTreeMap::new(),
            next_id: 0,
            failed: None,
        };
        let root = trunk.insert(None, 0);
        (trunk, root)
    }

    fn insert(&mut self, parent: Option<BranchId>, position: usize) -> BranchId {
        let id = BranchId(self.next_id);
        self.next_id += 1;
        self.branches.insert(id, Node { parent, position });
        id
    }

    fn node(&self, id: BranchId) -> BodyResult<&Node> {
        self.branches.get(&id).ok_or(BodyError::ClosedStream)
    }

    /// Registers a child of `parent` starting where `parent` currently is.
    pub(crate) fn fork(&mut self, parent: BranchId) -> BodyResult<BranchId> {
        let position = self.node(parent)?.position;
        let id = self.insert(Some(parent), position);
        trace!(parent = %parent, branch = %id, "branch forked");
        Ok(id)
    }

    pub(crate) fn is_live(&self, id: BranchId) -> bool {
        self.branches.contains_key(&id)
    }

    pub(crate) fn parent(&self, id: BranchId) -> Option<BranchId> {
        self.branches.get(&id).and_then(|node| node.parent)
    }

    fn descends_from(&self, id: BranchId, ancestor: BranchId) -> bool {
        let mut cursor = self.parent(id);
        while let Some(parent) = cursor {
            if parent == ancestor {
                return true;
            }
            cursor = self.parent(parent);
        }
        false
    }

    /// Moves `id` out from under `closing` so that closing it spares `id`.
    ///
    /// `id` is re-attached to the parent of `closing`; unrelated branches are
    /// left alone.
    pub(crate) fn detach(&mut self, id: BranchId, closing: BranchId) {
        if !self.descends_from(id, closing) {
            return;
        }
        let grandparent = self.parent(closing);
        if let Some(node) = self.branches.get_mut(&id) {
            node.parent = grandparent;
        }
    }

    pub(crate) fn live_count(&self) -> usize {
        self.branches.len()
    }

    pub(crate) fn is_buffering(&self) -> bool {
        self.buffer.is_some()
    }

    /// Serves `out` for branch `id`, from the buffer when the bytes are
    /// already there, otherwise from the source.
    pub(crate) fn read(&mut self, id: BranchId, out: &mut [u8]) -> BodyResult<usize> {
        let position = self.node(id)?.position;
        self.check_failed()?;
        if out.is_empty() {
            return Ok(0);
        }

        let n = match self.buffer.as_mut() {
            Some(buffer) if position < buffer.len() => buffer.read(position, out)?,
            _ => {
                let n = self.read_source(out)?;
                if n > 0 && self.branches.len() > 1 {
                    if let Err(e) = self.buffer().append(&out[..n]) {
                        return Err(self.fail(e, n));
                    }
                }
                n
            }
        };

        if let Some(node) = self.branches.get_mut(&id) {
            node.position += n;
        }
        self.try_release_buffer()?;
        Ok(n)
    }

    fn check_failed(&self) -> BodyResult<()> {
        match self.failed {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    /// Marks the trunk failed after `lost` source bytes could not be buffered.
    fn fail(&mut self, e: BodyError, lost: usize) -> BodyError {
        let failure = match &e {
            BodyError::Overflow { limit } => Failure::Overflow { limit: *limit },
            BodyError::Io(io) => Failure::Io(io.kind()),
            _ => Failure::Io(ErrorKind::Other),
        };
        warn!(lost, branches = self.branches.len(), error = %e, "trunk failed, bytes lost");
        self.failed = Some(failure);
        e
    }

    fn read_source(&mut self, out: &mut [u8]) -> BodyResult<usize> {
        let source = self.source.as_mut().ok_or(BodyError::ClosedStream)?;
        loop {
            match source.read(out) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// The shared buffer, allocated at the point of divergence.
    fn buffer(&mut self) -> &mut Buffer {
        if self.buffer.is_none() {
            // Everything before this point was read by all branches alike.
            for node in self.branches.values_mut() {
                node.position = 0;
            }
            debug!(branches = self.branches.len(), "branches diverged, buffering");
        }
        let factory = &self.factory;
        self.buffer.get_or_insert_with(|| factory.new_instance())
    }

    /// Frees the buffer once no live branch still has bytes to read from it.
    fn try_release_buffer(&mut self) -> BodyResult<()> {
        let Some(buffer) = &self.buffer else {
            return Ok(());
        };
        let len = buffer.len();
        if self.branches.values().any(|node| node.position < len) {
            return Ok(());
        }
        if let Some(mut buffer) = self.buffer.take() {
            debug!(length = len, "all branches caught up, buffer released");
            buffer.close()?;
        }
        Ok(())
    }

    /// Skips up to `n` bytes for branch `id`.
    ///
    /// A lone branch with nothing buffered uses the source's own skip; any
    /// other situation goes through [`Trunk::read`] so siblings still get the
    /// skipped bytes.
    pub(crate) fn skip(&mut self, id: BranchId, n: u64) -> BodyResult<u64> {
        self.node(id)?;
        self.check_failed()?;
        if self.buffer.is_none() && self.branches.len() == 1 {
            let source = self.source.as_mut().ok_or(BodyError::ClosedStream)?;
            return Ok(source.skip(n)?);
        }

        let mut scratch = [0u8; crate::util::SCRATCH_SIZE];
        let mut remaining = n;
        while remaining > 0 {
            let want = remaining.min(scratch.len() as u64) as usize;
            let k = self.read(id, &mut scratch[..want])?;
            if k == 0 {
                break;
            }
            remaining -= k as u64;
        }
        Ok(n - remaining)
    }

    pub(crate) fn available(&self, id: BranchId) -> BodyResult<u64> {
        let position = self.node(id)?.position;
        match &self.buffer {
            Some(buffer) if position < buffer.len() => Ok((buffer.len() - position) as u64),
            _ => Ok(self.source.as_ref().map_or(0, |source| source.available())),
        }
    }

    /// Closes `id` and every live branch descended from it.
    ///
    /// Closing an unknown or already closed branch is a no-op. When the last
    /// branch goes, the buffer and the source are closed too.
    pub(crate) fn close(&mut self, id: BranchId) -> BodyResult<()> {
        if !self.is_live(id) {
            return Ok(());
        }

        let mut closing = vec![id];
        let mut next = 0;
        while next < closing.len() {
            let parent = closing[next];
            closing.extend(
                self.branches
                    .iter()
                    .filter(|(_, node)| node.parent == Some(parent))
                    .map(|(child, _)| *child),
            );
            next += 1;
        }
        for branch in &closing {
            self.branches.remove(branch);
        }
        trace!(branch = %id, closed = closing.len(), live = self.branches.len(), "branch closed");

        let released = self.try_release_buffer();
        if self.branches.is_empty() {
            released.and(self.close_source())
        } else {
            released
        }
    }

    fn close_source(&mut self) -> BodyResult<()> {
        let Some(mut source) = self.source.take() else {
            return Ok(());
        };
        debug!("last branch closed, closing source");
        source.close()?;
        Ok(())
    }
}

impl fmt::Debug for Trunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trunk")
            .field("open", &self.source.is_some())
            .field("buffer", &self.buffer)
            .field("branches", &self.branches)
            .field("failed", &self.failed)
            .finish()
    }
}
