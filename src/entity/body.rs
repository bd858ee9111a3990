//! The Entity type - a message body with byte, text and JSON views.

use std::io::Cursor;
use std::mem;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use super::content_type::Charset;
use super::message::Headers;
use super::reader::ContentReader;
use crate::branch::{Branch, ByteSource, EmptySource};
use crate::config::BufferFactory;
use crate::error::{BodyError, BodyResult};
use crate::util::drain;

#[cfg(feature = "hash-blake3")]
use crate::hash::{Blake3Hasher, ContentDigest};

/// `Content-Type` written by [`Entity::set_json`] when none is set.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Where an entity is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// No content was ever assigned.
    Pristine,
    /// Content was assigned at least once.
    Set,
    /// This many branches are saved by [`Entity::push`] and no content was
    /// assigned since the last push or pop.
    Pushed(usize),
}

/// A message body.
///
/// The entity reads its content through a [`Branch`], so the byte, text and
/// JSON views can materialize the body without consuming it: each view reads
/// from a fresh branch and leaves the entity where it was.
///
/// Filters that need to look at or rewrite a body temporarily use
/// [`Entity::push`] and [`Entity::pop`]; whatever happens in between is
/// thrown away by the pop.
///
/// Setters keep `Content-Length` on the owning message in step with the new
/// content. Only [`Entity::set_json`] touches `Content-Type`.
///
/// # Example
///
/// ```
/// use trunkrs::Message;
///
/// let mut message = Message::new();
/// let entity = message.entity_mut();
/// entity.set_bytes(&b"original"[..])?;
///
/// entity.push()?;
/// entity.set_string("temporary")?;
/// assert_eq!(entity.get_string()?, "temporary");
/// entity.pop()?;
///
/// assert_eq!(entity.get_string()?, "original");
/// # Ok::<(), trunkrs::BodyError>(())
/// ```
#[derive(Debug)]
pub struct Entity {
    headers: Headers,
    factory: BufferFactory,
    current: Branch,
    /// Displaced branches, each with the state it was pushed from.
    stack: Vec<(Branch, EntityState)>,
    state: EntityState,
}

impl Entity {
    /// Creates a pristine entity bound to `headers`.
    pub fn new(headers: Headers, factory: BufferFactory) -> Self {
        let current = Branch::wrap(EmptySource, factory.clone());
        Self {
            headers,
            factory,
            current,
            stack: Vec::new(),
            state: EntityState::Pristine,
        }
    }

    /// The headers this entity keeps in step with its content.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The current lifecycle state.
    ///
    /// Assigning content always yields [`EntityState::Set`], even with
    /// branches still pushed; [`Entity::depth`] tells how many there are.
    pub fn state(&self) -> EntityState {
        self.state
    }

    /// Number of branches saved by [`Entity::push`].
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// False only while no content has ever been assigned.
    pub fn may_contain_data(&self) -> bool {
        self.state != EntityState::Pristine
    }

    /// The branch the entity reads through.
    pub fn raw_content_stream(&self) -> &Branch {
        &self.current
    }

    /// The branch the entity reads through, for reading it directly.
    ///
    /// Reading from it moves the entity's own position.
    pub fn raw_content_stream_mut(&mut self) -> &mut Branch {
        &mut self.current
    }

    /// Replaces the current branch, closing the old one. Headers are left
    /// alone. `None` puts back an empty stream and makes the entity pristine.
    pub fn set_raw_content_stream(&mut self, stream: Option<Branch>) -> BodyResult<()> {
        let (stream, state) = match stream {
            Some(stream) => (stream, EntityState::Set),
            None => (
                Branch::wrap(EmptySource, self.factory.clone()),
                EntityState::Pristine,
            ),
        };
        self.replace_current(stream)?;
        self.state = state;
        Ok(())
    }

    /// Closes the current branch, then installs `stream`. On error `stream`
    /// is dropped and nothing else about the entity changes.
    fn replace_current(&mut self, stream: Branch) -> BodyResult<()> {
        stream.detach_from(&self.current);
        self.current.close()?;
        self.current = stream;
        Ok(())
    }

    /// A fresh branch of the current content, positioned where the entity is.
    ///
    /// No content coding is applied: the branch yields the body as it sits
    /// on the message. The caller owns the branch; dropping it closes it.
    pub fn new_decoded_content_stream(&self) -> BodyResult<Branch> {
        self.current.branch()
    }

    /// A text reader over a fresh branch of the current content.
    ///
    /// Without an explicit `charset`, the one declared by `Content-Type` is
    /// used, falling back to UTF-8.
    pub fn new_decoded_content_reader(
        &self,
        charset: Option<Charset>,
    ) -> BodyResult<ContentReader> {
        let charset = match charset {
            Some(charset) => charset,
            None => self.charset()?,
        };
        Ok(ContentReader::new(self.current.branch()?, charset))
    }

    /// The charset declared by the owning message, or UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::Decode`] if `Content-Type` names an unsupported
    /// charset.
    pub fn charset(&self) -> BodyResult<Charset> {
        match self.headers.content_type() {
            Some(content_type) => Ok(content_type.charset()?.unwrap_or_default()),
            None => Ok(Charset::default()),
        }
    }

    /// The remaining content as bytes. The entity's position is unchanged.
    pub fn get_bytes(&self) -> BodyResult<Bytes> {
        let mut branch = self.current.branch()?;
        let bytes = drain(&mut branch)?;
        branch.close()?;
        Ok(bytes)
    }

    /// The remaining content as text, decoded with [`Entity::charset`].
    pub fn get_string(&self) -> BodyResult<String> {
        let charset = self.charset()?;
        charset.decode(&self.get_bytes()?)
    }

    /// The remaining content parsed as JSON; `None` when there is none.
    ///
    /// Object keys keep their document order.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::Decode`] on malformed JSON. The content is not
    /// consumed, so it can still be read some other way.
    pub fn get_json(&self) -> BodyResult<Option<Value>> {
        self.get_json_as()
    }

    /// The remaining content deserialized into `T`; `None` when there is none.
    pub fn get_json_as<T: DeserializeOwned>(&self) -> BodyResult<Option<T>> {
        let bytes = self.get_bytes()?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Replaces the content with `data` and sets `Content-Length`.
    pub fn set_bytes(&mut self, data: impl Into<Bytes>) -> BodyResult<()> {
        let data = data.into();
        let length = data.len() as u64;
        self.set_stream(Cursor::new(data), Some(length))
    }

    /// Replaces the content with `text`, encoded in [`Entity::charset`].
    pub fn set_string(&mut self, text: &str) -> BodyResult<()> {
        let charset = self.charset()?;
        self.set_bytes(charset.encode(text))
    }

    /// Replaces the content with `value` serialized as JSON.
    ///
    /// Also sets `Content-Type` to [`JSON_CONTENT_TYPE`] if the message has
    /// none.
    pub fn set_json<T: Serialize + ?Sized>(&mut self, value: &T) -> BodyResult<()> {
        let encoded = serde_json::to_vec(value)?;
        self.set_bytes(encoded)?;
        self.headers.set_content_type_if_absent(JSON_CONTENT_TYPE);
        Ok(())
    }

    /// Replaces the content with nothing; `Content-Length` becomes `0`.
    pub fn set_empty(&mut self) -> BodyResult<()> {
        self.set_bytes(Bytes::new())
    }

    /// Replaces the content with a physical source.
    ///
    /// `Content-Length` is written when `length` is known and removed when it
    /// is not.
    pub fn set_stream<S>(&mut self, source: S, length: Option<u64>) -> BodyResult<()>
    where
        S: ByteSource + 'static,
    {
        let stream = Branch::wrap(source, self.factory.clone());
        self.replace_current(stream)?;
        self.state = EntityState::Set;
        self.headers.set_content_length(length);
        Ok(())
    }

    /// Saves the current branch and continues on a fresh branch of it.
    pub fn push(&mut self) -> BodyResult<()> {
        let branch = self.current.branch()?;
        let saved = mem::replace(&mut self.current, branch);
        self.stack.push((saved, self.state));
        self.state = EntityState::Pushed(self.stack.len());
        trace!(depth = self.stack.len(), "entity pushed");
        Ok(())
    }

    /// Closes the current branch and restores the last one pushed.
    ///
    /// With nothing left on the stack the entity goes back to the state it
    /// had before the first push.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::IllegalPushPop`] if nothing was pushed.
    pub fn pop(&mut self) -> BodyResult<()> {
        let (saved, before) = self.stack.pop().ok_or(BodyError::IllegalPushPop)?;
        let mut discarded = mem::replace(&mut self.current, saved);
        self.state = match self.stack.len() {
            0 => before,
            depth => EntityState::Pushed(depth),
        };
        trace!(depth = self.stack.len(), "entity popped");
        discarded.close()
    }

    /// Closes the current branch and everything still pushed.
    pub fn close(&mut self) -> BodyResult<()> {
        let mut result = self.current.close();
        while let Some((mut saved, _)) = self.stack.pop() {
            result = result.and(saved.close());
        }
        result
    }

    /// BLAKE3 digest of the remaining content. The entity's position is
    /// unchanged.
    #[cfg(feature = "hash-blake3")]
    pub fn digest(&self) -> BodyResult<ContentDigest> {
        let mut branch = self.current.branch()?;
        let mut hasher = Blake3Hasher::new();
        let mut scratch = [0u8; crate::util::SCRATCH_SIZE];
        loop {
            let n = branch.read_bytes(&mut scratch)?;
            if n == 0 {
                break;
            }
            hasher.update(&scratch[..n]);
        }
        Ok(hasher.finalize())
    }
}
