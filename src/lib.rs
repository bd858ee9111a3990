//! trunkrs
//!
//! Branching, replayable message bodies for HTTP gateways.
//!
//! A gateway filter chain often needs to look at a body more than once: log
//! it, sign it, parse it as JSON, and still forward it untouched. `trunkrs`
//! lets any number of readers ("branches") consume one physical byte source
//! at their own pace while each byte is read from the source only once.
//!
//! - Branches that stay in lockstep cost nothing extra
//! - Once they diverge, the bytes in between are kept in a shared buffer that
//!   starts in memory, spills to a temporary file, and has a hard ceiling
//! - The buffer is freed as soon as every branch has moved past it
//!
//! On top of that, [`Entity`] gives a message body byte/string/JSON views and
//! a push/pop stack for scoped temporary overrides, keeping `Content-Length`
//! and `Content-Type` in step.
//!
//! The crate intentionally:
//! - does NOT do socket or transport I/O
//! - does NOT apply content codings (gzip, deflate, ...)
//! - does NOT synchronize: one message, one thread at a time
//!
//! # Branches
//!
//! ```
//! use std::io::{Cursor, Read};
//! use trunkrs::{Branch, BufferFactory};
//!
//! let mut forward = Branch::wrap(Cursor::new(b"payload".to_vec()), BufferFactory::default());
//! let mut log = forward.branch()?;
//!
//! let mut logged = String::new();
//! log.read_to_string(&mut logged)?;
//!
//! let mut forwarded = String::new();
//! forward.read_to_string(&mut forwarded)?;
//! assert_eq!(logged, forwarded);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Entities
//!
//! ```
//! use trunkrs::Message;
//!
//! let mut message = Message::new();
//! message.entity_mut().set_json(&serde_json::json!({"a": 1, "b": 2}))?;
//!
//! let json = message.entity().get_json()?.unwrap();
//! assert_eq!(json["b"], 2);
//! assert_eq!(message.headers().content_length(), Some(13));
//! # Ok::<(), trunkrs::BodyError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod branch;
mod buffer;
mod config;
mod entity;
mod error;
mod hash;

mod util; // internal helpers

//
// Public surface
//

pub use branch::{Branch, BranchId, ByteSource, EmptySource, ReaderSource};
pub use buffer::Buffer;
pub use config::{BufferFactory, DEFAULT_FILE_LIMIT, DEFAULT_INITIAL_LENGTH, DEFAULT_MEMORY_LIMIT};
pub use entity::{
    Charset, ContentReader, ContentType, Entity, EntityState, Headers, JSON_CONTENT_TYPE, Message,
};
pub use error::{BodyError, BodyResult};
pub use hash::ContentDigest;
