//! Message bodies.
//!
//! - [`Entity`] - byte, text and JSON views of a body, with push/pop
//! - [`Message`] - headers plus an entity
//! - [`Headers`] - shared handle on a message's header map
//! - [`ContentType`] / [`Charset`] - what the views decode with
//! - [`ContentReader`] - text reader over a branch of a body

mod body;
mod content_type;
mod message;
mod reader;

pub use body::{Entity, EntityState, JSON_CONTENT_TYPE};
pub use content_type::{Charset, ContentType};
pub use message::{Headers, Message};
pub use reader::ContentReader;
