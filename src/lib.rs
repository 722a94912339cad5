//! In-process asynchronous message passing between decoupled components.
//!
//! Courier provides two delivery mechanisms for components that hold no direct
//! references to each other:
//!
//! - a point-to-point path: [`Messenger`], a bounded FIFO queue with
//!   asynchronous write and read, independent sticky cancellation of each
//!   side, and one-shot closure (optionally carrying an error); and
//! - a broadcast path: [`ObservableBus`] fans messages out to subscribed
//!   [`Listener`]s with snapshot delivery, fronted by [`MessagingService`],
//!   which guarantees at most one live subscription per listener identity.
//!
//! Messages travel as [`Arc<Message>`](Message): an immutable carrier of
//! optional content, an opaque payload, and type tags for payload, sender and
//! receiver.

pub mod bus;
pub mod error;
pub mod message;
pub mod messenger;
pub mod observer;
pub mod service;

// Public re-exports for convenience.
pub use bus::{ObservableBus, Subscription};
pub use error::{CloseError, Fault, ReadError, TryReadError, TryWriteError, WriteError};
pub use message::{Message, Payload, TypeTag};
pub use messenger::{Messenger, DEFAULT_CAPACITY};
pub use observer::{Listener, Observer, ObserverId};
pub use service::{MessagingService, RegisterOutcome};
