//! Branching streams over a single physical source.
//!
//! - [`Branch`] - an independent reader; fork more with [`Branch::branch`]
//! - [`BranchId`] - identity of a branch within its trunk
//! - [`ByteSource`] - what a trunk reads from
//!
//! Branches that read in lockstep share nothing but the source. The moment
//! one branch needs a byte a sibling has not consumed yet, the trunk starts a
//! [`crate::Buffer`] and keeps it until every branch has moved past its end.

mod source;
mod stream;
mod trunk;

pub use source::{ByteSource, EmptySource, ReaderSource};
pub use stream::Branch;
pub use trunk::BranchId;
