//! The owning message: a header map shared with its entity.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};

use super::body::Entity;
use super::content_type::ContentType;
use crate::config::BufferFactory;

/// A handle on a message's headers.
///
/// Clones share the same map. An [`Entity`] holds one so it can keep
/// `Content-Length` and `Content-Type` in step with its content; it never
/// touches any other header.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    map: Rc<RefCell<HeaderMap>>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows the header map.
    ///
    /// # Panics
    ///
    /// Panics if the map is currently borrowed mutably.
    pub fn borrow(&self) -> Ref<'_, HeaderMap> {
        self.map.borrow()
    }

    /// Borrows the header map mutably.
    ///
    /// # Panics
    ///
    /// Panics if the map is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, HeaderMap> {
        self.map.borrow_mut()
    }

    /// The `Content-Length` value, if present and a valid decimal count.
    pub fn content_length(&self) -> Option<u64> {
        self.borrow()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    /// The parsed `Content-Type`, if present and readable as text.
    pub fn content_type(&self) -> Option<ContentType> {
        self.borrow()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ContentType::parse)
    }

    /// Writes `Content-Length`, or removes it when the length is unknown.
    pub(crate) fn set_content_length(&self, length: Option<u64>) {
        let mut map = self.borrow_mut();
        match length {
            Some(len) => {
                map.insert(CONTENT_LENGTH, HeaderValue::from(len));
            }
            None => {
                map.remove(CONTENT_LENGTH);
            }
        }
    }

    /// Writes `Content-Type` unless the message already has one.
    pub(crate) fn set_content_type_if_absent(&self, value: &'static str) {
        self.borrow_mut()
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static(value));
    }
}

/// A message with headers and a body.
///
/// # Example
///
/// ```
/// use trunkrs::Message;
///
/// let mut message = Message::new();
/// message.entity_mut().set_string("hello")?;
/// assert_eq!(message.headers().content_length(), Some(5));
/// assert_eq!(message.entity().get_string()?, "hello");
/// # Ok::<(), trunkrs::BodyError>(())
/// ```
#[derive(Debug)]
pub struct Message {
    headers: Headers,
    entity: Entity,
}

impl Message {
    /// Creates a message with no headers and a pristine entity.
    pub fn new() -> Self {
        Self::with_factory(BufferFactory::default())
    }

    /// Creates a message whose entity buffers with `factory`.
    pub fn with_factory(factory: BufferFactory) -> Self {
        let headers = Headers::new();
        let entity = Entity::new(headers.clone(), factory);
        Self { headers, entity }
    }

    /// The message headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The message body.
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// The message body, for setters and push/pop.
    pub fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    /// Consumes the message, returning its body.
    pub fn into_entity(self) -> Entity {
        self.entity
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}
