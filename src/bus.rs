// src/bus.rs

//! The broadcast bus: an ordered set of listeners and snapshot delivery.
//!
//! [`ObservableBus`] owns the live subscriber list. Every broadcast
//! (`notify`, `complete`, `error`) copies the list under the lock, releases
//! the lock, then delivers to the copy in subscription order, so listeners
//! subscribed or removed mid-broadcast never disturb the in-progress
//! delivery. Delivery is synchronous and sequential: a slow listener delays
//! the listeners after it in the same call.
//!
//! Subscribing returns a [`Subscription`] handle; releasing it via
//! [`Subscription::unsubscribe`] is the only way to remove a single listener.
//! Dropping the handle leaves the subscription live.

use core::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::Fault;
use crate::message::Message;
use crate::observer::{Listener, ObserverId};

type ListenerList = Arc<Mutex<Vec<Arc<dyn Listener>>>>;

/// An observer-based publish/subscribe bus over [`Message`] broadcasts.
///
/// Safe to drive from multiple threads without external locking; the
/// subscriber list is only ever mutated under the bus's own lock.
pub struct ObservableBus {
  listeners: ListenerList,
}

impl ObservableBus {
  /// Creates a bus with no subscribers.
  pub fn new() -> Self {
    ObservableBus {
      listeners: Arc::new(Mutex::new(Vec::new())),
    }
  }

  /// Subscribes `listener` to future broadcasts.
  ///
  /// If a listener with the same identity is already subscribed the list is
  /// left untouched, but a handle is issued either way; releasing any handle
  /// for an identity removes that identity's single live entry.
  pub fn subscribe(&self, listener: Arc<dyn Listener>) -> Subscription {
    let id = listener.id();
    {
      let mut listeners = self.listeners.lock();
      let already_present = listeners.iter().any(|l| l.id() == id);
      if !already_present {
        debug!(%id, "listener subscribed");
        listeners.push(listener);
      }
    }
    Subscription {
      listeners: Arc::clone(&self.listeners),
      id,
    }
  }

  /// Broadcasts `message` to every listener subscribed at the time of the
  /// call, in subscription order.
  pub fn notify(&self, message: Arc<Message>) {
    let snapshot: Vec<Arc<dyn Listener>> = self.listeners.lock().clone();
    debug!(listeners = snapshot.len(), ?message, "notifying listeners");
    for listener in snapshot {
      listener.on_next(Arc::clone(&message));
    }
  }

  /// Delivers `on_completed` to a snapshot of all subscribers in order, then
  /// clears the subscriber list. Listeners must re-subscribe to hear further
  /// broadcasts.
  pub fn complete(&self) {
    let snapshot: Vec<Arc<dyn Listener>> = self.listeners.lock().clone();
    debug!(listeners = snapshot.len(), "completing bus");
    for listener in snapshot {
      listener.on_completed();
    }
    self.listeners.lock().clear();
  }

  /// Delivers `on_error(fault)` to a snapshot of all subscribers in order,
  /// then clears the subscriber list.
  pub fn error(&self, fault: Fault) {
    let snapshot: Vec<Arc<dyn Listener>> = self.listeners.lock().clone();
    debug!(listeners = snapshot.len(), %fault, "erroring bus");
    for listener in snapshot {
      listener.on_error(Arc::clone(&fault));
    }
    self.listeners.lock().clear();
  }

  /// The number of currently subscribed listeners.
  pub fn observer_count(&self) -> usize {
    self.listeners.lock().len()
  }
}

impl Default for ObservableBus {
  fn default() -> Self {
    ObservableBus::new()
  }
}

impl fmt::Debug for ObservableBus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ObservableBus")
      .field("observer_count", &self.observer_count())
      .finish()
  }
}

/// The handle returned by [`ObservableBus::subscribe`].
///
/// Release is explicit and idempotent: [`unsubscribe`](Subscription::unsubscribe)
/// removes the listener from the live list if it is still present, and is a
/// no-op otherwise (including after `complete`/`error` already cleared the
/// list). Dropping the handle does not unsubscribe.
pub struct Subscription {
  listeners: ListenerList,
  id: ObserverId,
}

impl Subscription {
  /// The identity of the listener this handle was issued for.
  #[inline]
  pub fn id(&self) -> ObserverId {
    self.id
  }

  /// Removes the listener from the live subscriber list, if still present.
  pub fn unsubscribe(&self) {
    let mut listeners = self.listeners.lock();
    if let Some(position) = listeners.iter().position(|l| l.id() == self.id) {
      debug!(id = %self.id, "listener unsubscribed");
      listeners.remove(position);
    }
  }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription").field("id", &self.id).finish()
  }
}
