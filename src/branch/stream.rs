//! The Branch type - one logical reader over a shared trunk.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Read};
use std::rc::Rc;

use tracing::debug;

use super::source::ByteSource;
use super::trunk::{BranchId, Trunk};
use crate::config::BufferFactory;
use crate::error::{BodyError, BodyResult};

/// An independent reader over a physical byte source.
///
/// Every branch of a trunk sees the same byte sequence, and each physical
/// byte is read from the source at most once: bytes one branch reads ahead of
/// its siblings are kept in a shared buffer until they have all caught up.
///
/// A branch closes itself when dropped. Closing a branch also closes every
/// branch forked from it, and closing the last branch closes the source.
///
/// Branches are single-threaded: a trunk and all of its branches belong to
/// whoever is processing the message.
///
/// # Example
///
/// ```
/// use std::io::{Cursor, Read};
/// use trunkrs::{Branch, BufferFactory};
///
/// let mut a = Branch::wrap(Cursor::new(b"AB CD".to_vec()), BufferFactory::default());
/// let mut b = a.branch()?;
///
/// let mut two = [0u8; 2];
/// a.read_exact(&mut two)?;
/// assert_eq!(&two, b"AB");
///
/// let mut all = Vec::new();
/// b.read_to_end(&mut all)?;
/// assert_eq!(all, b"AB CD");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Branch {
    trunk: Rc<RefCell<Trunk>>,
    id: BranchId,
}

impl Branch {
    /// Wraps a physical source, returning the root branch of a new trunk.
    pub fn wrap<S>(source: S, factory: BufferFactory) -> Self
    where
        S: ByteSource + 'static,
    {
        let (trunk, id) = Trunk::new(Box::new(source), factory);
        Self {
            trunk: Rc::new(RefCell::new(trunk)),
            id,
        }
    }

    /// Forks a new branch starting at this branch's current position.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::ClosedStream`] if this branch is closed.
    pub fn branch(&self) -> BodyResult<Branch> {
        let id = self.trunk.borrow_mut().fork(self.id)?;
        Ok(Self {
            trunk: Rc::clone(&self.trunk),
            id,
        })
    }

    /// Reads into `out`, returning the number of bytes read (zero at the end).
    ///
    /// Same as [`Read::read`] but with the crate's error type.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> BodyResult<usize> {
        self.trunk.borrow_mut().read(self.id, out)
    }

    /// Skips up to `n` bytes, returning how many were skipped.
    pub fn skip(&mut self, n: u64) -> BodyResult<u64> {
        self.trunk.borrow_mut().skip(self.id, n)
    }

    /// Bytes that can be read without touching the source, or the source's
    /// own estimate when nothing is buffered ahead of this branch.
    pub fn available(&self) -> BodyResult<u64> {
        self.trunk.borrow().available(self.id)
    }

    /// Closes this branch and every branch forked from it. Idempotent.
    pub fn close(&mut self) -> BodyResult<()> {
        self.trunk.borrow_mut().close(self.id)
    }

    /// This branch's identity within its trunk.
    pub fn id(&self) -> BranchId {
        self.id
    }

    /// The branch this one was forked from; `None` for the root or once closed.
    pub fn parent_id(&self) -> Option<BranchId> {
        self.trunk.borrow().parent(self.id)
    }

    /// True once closed, directly or through an ancestor.
    pub fn is_closed(&self) -> bool {
        !self.trunk.borrow().is_live(self.id)
    }

    /// Number of open branches on this trunk, this one included.
    pub fn live_branches(&self) -> usize {
        self.trunk.borrow().live_count()
    }

    /// True while branches have diverged and a shared buffer is held.
    pub fn is_buffering(&self) -> bool {
        self.trunk.borrow().is_buffering()
    }

    /// True if `other` reads from the same physical source.
    pub fn same_trunk(&self, other: &Branch) -> bool {
        Rc::ptr_eq(&self.trunk, &other.trunk)
    }

    /// Keeps this branch open when `closing` is closed, should it have been
    /// forked (directly or not) from `closing`.
    pub(crate) fn detach_from(&self, closing: &Branch) {
        if self.same_trunk(closing) {
            self.trunk.borrow_mut().detach(self.id, closing.id);
        }
    }
}

impl Read for Branch {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bytes(buf).map_err(BodyError::into_io)
    }
}

/// A branch can itself be the physical source of another trunk.
impl ByteSource for Branch {
    fn skip(&mut self, n: u64) -> io::Result<u64> {
        Branch::skip(self, n).map_err(BodyError::into_io)
    }

    fn available(&self) -> u64 {
        Branch::available(self).unwrap_or(0)
    }

    fn close(&mut self) -> io::Result<()> {
        Branch::close(self).map_err(BodyError::into_io)
    }
}

impl Drop for Branch {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!(branch = %self.id, error = %e, "error closing dropped branch");
        }
    }
}

impl fmt::Debug for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn wrap(data: &[u8]) -> Branch {
        Branch::wrap(Cursor::new(data.to_vec()), BufferFactory::default())
    }

    fn read_n(branch: &mut Branch, n: usize) -> Vec<u8> {
        let mut out = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            let k = branch.read_bytes(&mut out[filled..]).unwrap();
            if k == 0 {
                break;
            }
            filled += k;
        }
        out.truncate(filled);
        out
    }

    #[test]
    fn test_branch_then_close_leaves_parent_untouched() {
        let mut root = wrap(b"0123456789");
        assert_eq!(read_n(&mut root, 3), b"012");

        let mut child = root.branch().unwrap();
        assert_eq!(child.parent_id(), Some(root.id()));
        child.close().unwrap();

        assert_eq!(read_n(&mut root, 100), b"3456789");
        assert!(!root.is_buffering());
    }

    #[test]
    fn test_operations_after_close_fail() {
        let mut root = wrap(b"abc");
        root.close().unwrap();
        root.close().unwrap();

        assert!(root.is_closed());
        assert!(matches!(root.branch(), Err(BodyError::ClosedStream)));
        assert!(matches!(root.skip(1), Err(BodyError::ClosedStream)));
        assert!(matches!(root.available(), Err(BodyError::ClosedStream)));

        let mut buf = [0u8; 1];
        let err: BodyError = root.read(&mut buf).unwrap_err().into();
        assert!(matches!(err, BodyError::ClosedStream));
    }

    #[test]
    fn test_drop_closes_branch() {
        let root = wrap(b"abc");
        {
            let _child = root.branch().unwrap();
            assert_eq!(root.live_branches(), 2);
        }
        assert_eq!(root.live_branches(), 1);
    }

    #[test]
    fn test_parent_close_cascades() {
        let mut root = wrap(b"abc");
        let child = root.branch().unwrap();
        let grandchild = child.branch().unwrap();

        root.close().unwrap();
        assert!(child.is_closed());
        assert!(grandchild.is_closed());
        assert_eq!(grandchild.parent_id(), None);
    }

    #[test]
    fn test_skip_with_sibling_keeps_bytes() {
        let mut root = wrap(b"0123456789");
        let mut child = root.branch().unwrap();

        assert_eq!(root.skip(4).unwrap(), 4);
        assert!(root.is_buffering());
        assert_eq!(read_n(&mut child, 10), b"0123456789");
        assert_eq!(read_n(&mut root, 10), b"456789");
    }

    #[test]
    fn test_lone_skip_uses_source() {
        let mut root = wrap(b"0123456789");
        assert_eq!(root.skip(7).unwrap(), 7);
        assert!(!root.is_buffering());
        assert_eq!(root.available().unwrap(), 3);
        assert_eq!(read_n(&mut root, 10), b"789");
        assert_eq!(root.skip(5).unwrap(), 0);
    }

    #[test]
    fn test_available_prefers_buffer() {
        let mut root = wrap(b"0123456789");
        let child = root.branch().unwrap();
        read_n(&mut root, 6);

        assert_eq!(child.available().unwrap(), 6);
        assert_eq!(root.available().unwrap(), 4);
    }

    #[test]
    fn test_branch_as_source() {
        let root = wrap(b"nested");
        let inner = root.branch().unwrap();
        let mut outer = Branch::wrap(inner, BufferFactory::default());

        assert_eq!(read_n(&mut outer, 10), b"nested");
        assert!(!outer.same_trunk(&root));

        // closing the outer trunk closes the inner branch it wraps
        outer.close().unwrap();
        assert_eq!(root.live_branches(), 1);
    }
}
