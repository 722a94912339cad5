// src/observer.rs

//! Listener seam and the stateful [`Observer`] that tracks what it was told.
//!
//! [`Listener`] is the push-based callback surface the bus and the messaging
//! service deliver to: `on_next` for each broadcast message, then at most one
//! of `on_completed` or `on_error`. [`Observer`] is the stock implementation:
//! it remembers the last message received while active and becomes inert once
//! the sequence terminates.

use core::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::Fault;
use crate::message::Message;

static NEXT_OBSERVER_ID: AtomicU64 = AtomicU64::new(1);

/// A process-unique identifier for a listener.
///
/// Identity, not state, is what distinguishes two listeners: the bus
/// suppresses duplicate subscriptions by id, and the messaging service keys
/// its registry by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
  /// Allocates the next process-unique id.
  pub fn next() -> Self {
    ObserverId(NEXT_OBSERVER_ID.fetch_add(1, Ordering::Relaxed))
  }
}

impl fmt::Display for ObserverId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "observer-{}", self.0)
  }
}

/// A subscriber to an [`ObservableBus`](crate::ObservableBus).
///
/// Implementations must be safe to call from multiple threads; the bus invokes
/// the callbacks synchronously, in subscription order, from whichever thread
/// triggered the broadcast. None of the callbacks may panic after the sequence
/// has terminated.
pub trait Listener: Send + Sync {
  /// The stable identity of this listener. Must not change over the
  /// listener's lifetime.
  fn id(&self) -> ObserverId;

  /// A message was broadcast.
  fn on_next(&self, message: Arc<Message>);

  /// The sequence terminated normally. Terminal; delivered at most once per
  /// bus lifecycle.
  fn on_completed(&self);

  /// The sequence terminated with an error. Terminal.
  fn on_error(&self, error: Fault);
}

#[derive(Default)]
struct ObserverState {
  completed: bool,
  error: Option<Fault>,
  last_message: Option<Arc<Message>>,
}

impl ObserverState {
  fn snapshot(&self) -> (bool, Option<Fault>, Option<Arc<Message>>) {
    (self.completed, self.error.clone(), self.last_message.clone())
  }
}

/// A stateful listener tracking the last received message.
///
/// Created active; `on_completed` and `on_error` terminate it, after which
/// every further event is silently ignored. Equality and hashing cover
/// `{completed, error, last_message, id}` with faults and messages compared by
/// pointer identity. The id term means two observers with identical observed
/// history are still distinct subscribers.
pub struct Observer {
  id: ObserverId,
  state: Mutex<ObserverState>,
}

impl Observer {
  /// Creates an active observer with a fresh process-unique id.
  pub fn new() -> Self {
    Observer {
      id: ObserverId::next(),
      state: Mutex::new(ObserverState::default()),
    }
  }

  /// Returns `true` once the sequence has terminated, via completion or error.
  pub fn is_completed(&self) -> bool {
    self.state.lock().completed
  }

  /// The fault received from `on_error`, if the sequence terminated with one.
  pub fn error(&self) -> Option<Fault> {
    self.state.lock().error.clone()
  }

  /// The most recent message received while the observer was active.
  pub fn last_message(&self) -> Option<Arc<Message>> {
    self.state.lock().last_message.clone()
  }
}

impl Default for Observer {
  fn default() -> Self {
    Observer::new()
  }
}

impl Listener for Observer {
  fn id(&self) -> ObserverId {
    self.id
  }

  fn on_next(&self, message: Arc<Message>) {
    let mut state = self.state.lock();
    if state.completed {
      trace!(id = %self.id, "sequence terminated, ignoring message");
      return;
    }
    trace!(id = %self.id, ?message, "observer received message");
    state.last_message = Some(message);
  }

  fn on_completed(&self) {
    let mut state = self.state.lock();
    if state.completed {
      return;
    }
    debug!(id = %self.id, "observer sequence completed");
    state.completed = true;
  }

  fn on_error(&self, error: Fault) {
    let mut state = self.state.lock();
    if state.completed {
      return;
    }
    debug!(id = %self.id, %error, "observer sequence errored");
    state.error = Some(error);
    state.completed = true;
  }
}

fn fault_ptr_eq(a: &Option<Fault>, b: &Option<Fault>) -> bool {
  match (a, b) {
    (None, None) => true,
    (Some(a), Some(b)) => Arc::ptr_eq(a, b),
    _ => false,
  }
}

fn message_ptr_eq(a: &Option<Arc<Message>>, b: &Option<Arc<Message>>) -> bool {
  match (a, b) {
    (None, None) => true,
    (Some(a), Some(b)) => Arc::ptr_eq(a, b),
    _ => false,
  }
}

impl PartialEq for Observer {
  fn eq(&self, other: &Self) -> bool {
    if std::ptr::eq(self, other) {
      return true;
    }
    // Snapshot one side at a time; never hold both locks.
    let (completed, error, last_message) = self.state.lock().snapshot();
    let (o_completed, o_error, o_last) = other.state.lock().snapshot();
    completed == o_completed
      && fault_ptr_eq(&error, &o_error)
      && message_ptr_eq(&last_message, &o_last)
      && self.id == other.id
  }
}
impl Eq for Observer {}

impl Hash for Observer {
  fn hash<H: Hasher>(&self, hasher: &mut H) {
    let (completed, error, last_message) = self.state.lock().snapshot();
    completed.hash(hasher);
    error
      .map(|e| Arc::as_ptr(&e) as *const () as usize)
      .unwrap_or(0)
      .hash(hasher);
    last_message
      .map(|m| Arc::as_ptr(&m) as usize)
      .unwrap_or(0)
      .hash(hasher);
    self.id.hash(hasher);
  }
}

impl fmt::Debug for Observer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let (completed, error, last_message) = self.state.lock().snapshot();
    f.debug_struct("Observer")
      .field("id", &self.id)
      .field("is_completed", &completed)
      .field("error", &error)
      .field("last_message", &last_message)
      .finish()
  }
}
