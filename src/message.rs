// src/message.rs

//! The message value type moved through the messenger and the bus.
//!
//! A [`Message`] is an immutable carrier: optional text content, an optional
//! opaque payload, and optional type tags naming the payload type, the sending
//! component and the intended receiving component. None of the fields are
//! validated; an all-empty message is legal and meaningful.
//!
//! Broadcast delivery hands every listener the same `Arc<Message>`, so message
//! identity is `Arc` pointer identity rather than field-by-field comparison
//! (the payload is a `dyn Any` box and has no general notion of equality).

use core::fmt;
use std::any::{self, Any, TypeId};

/// A lightweight tag identifying a Rust type, used to label a message's
/// payload type and its sender/receiver components.
///
/// Tags compare and hash by [`TypeId`]; the captured type name is carried
/// purely for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeTag {
  id: TypeId,
  name: &'static str,
}

impl TypeTag {
  /// Creates the tag for the type `T`.
  pub fn of<T: ?Sized + 'static>() -> Self {
    TypeTag {
      id: TypeId::of::<T>(),
      name: any::type_name::<T>(),
    }
  }

  /// The full type name this tag was created from.
  #[inline]
  pub fn name(self) -> &'static str {
    self.name
  }

  /// Returns `true` if this tag was created for the type `T`.
  #[inline]
  pub fn is<T: ?Sized + 'static>(&self) -> bool {
    self.id == TypeId::of::<T>()
  }
}

impl PartialEq for TypeTag {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}
impl Eq for TypeTag {}

impl std::hash::Hash for TypeTag {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

impl fmt::Debug for TypeTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "TypeTag({})", self.name)
  }
}

/// The opaque payload slot of a [`Message`].
pub type Payload = Box<dyn Any + Send + Sync>;

/// An immutable value carrying content, an opaque payload, and optional type
/// tags identifying payload type, sender and receiver.
///
/// Construct with [`Message::new`] (full five-field form) or
/// [`Message::with_data`] (derives the payload type tag automatically).
pub struct Message {
  content: Option<String>,
  data: Option<Payload>,
  data_type: Option<TypeTag>,
  sender: Option<TypeTag>,
  receiver: Option<TypeTag>,
}

impl Message {
  /// Creates a message from all five fields. No validation is performed;
  /// every field may be `None`.
  pub fn new(
    content: Option<String>,
    data: Option<Payload>,
    data_type: Option<TypeTag>,
    sender: Option<TypeTag>,
    receiver: Option<TypeTag>,
  ) -> Self {
    Message {
      content,
      data,
      data_type,
      sender,
      receiver,
    }
  }

  /// Creates a message with content and a payload, deriving the payload type
  /// tag from `D`. Sender and receiver tags are left empty.
  pub fn with_data<D: Any + Send + Sync>(content: impl Into<String>, data: D) -> Self {
    Message {
      content: Some(content.into()),
      data: Some(Box::new(data)),
      data_type: Some(TypeTag::of::<D>()),
      sender: None,
      receiver: None,
    }
  }

  /// Creates a content-only message.
  pub fn text(content: impl Into<String>) -> Self {
    Message {
      content: Some(content.into()),
      data: None,
      data_type: None,
      sender: None,
      receiver: None,
    }
  }

  /// Stamps the sender component tag. Consumes and returns the message, for
  /// use during construction.
  pub fn from_sender<S: ?Sized + 'static>(mut self) -> Self {
    self.sender = Some(TypeTag::of::<S>());
    self
  }

  /// Stamps the receiver component tag. Consumes and returns the message, for
  /// use during construction.
  pub fn to_receiver<R: ?Sized + 'static>(mut self) -> Self {
    self.receiver = Some(TypeTag::of::<R>());
    self
  }

  /// The text content, if any.
  #[inline]
  pub fn content(&self) -> Option<&str> {
    self.content.as_deref()
  }

  /// Borrows the payload downcast to `D`, or `None` if there is no payload or
  /// the payload is of a different type.
  pub fn data<D: Any>(&self) -> Option<&D> {
    self.data.as_ref().and_then(|d| d.downcast_ref::<D>())
  }

  /// Returns `true` if the message carries a payload.
  #[inline]
  pub fn has_data(&self) -> bool {
    self.data.is_some()
  }

  /// The tag of the payload type, if one was recorded.
  #[inline]
  pub fn data_type(&self) -> Option<TypeTag> {
    self.data_type
  }

  /// The tag of the sending component, if one was recorded.
  #[inline]
  pub fn sender(&self) -> Option<TypeTag> {
    self.sender
  }

  /// The tag of the intended receiving component, if one was recorded.
  #[inline]
  pub fn receiver(&self) -> Option<TypeTag> {
    self.receiver
  }
}

impl Default for Message {
  /// An all-empty message.
  fn default() -> Self {
    Message::new(None, None, None, None, None)
  }
}

impl fmt::Debug for Message {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Message")
      .field("content", &self.content)
      .field("data", &self.data.as_ref().map(|_| "<payload>"))
      .field("data_type", &self.data_type.map(TypeTag::name))
      .field("sender", &self.sender.map(TypeTag::name))
      .field("receiver", &self.receiver.map(TypeTag::name))
      .finish()
  }
}
