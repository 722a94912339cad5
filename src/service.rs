// src/service.rs

//! The messaging service: a bus facade enforcing at-most-one live
//! subscription per listener identity.
//!
//! The registry maps listener ids to their active [`Subscription`] handles.
//! It exists solely to reject duplicate registrations and make unregistration
//! idempotent; delivery itself is delegated to the [`ObservableBus`].

use core::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::bus::{ObservableBus, Subscription};
use crate::message::Message;
use crate::observer::{Listener, ObserverId};

/// The result of [`MessagingService::register_listener`].
///
/// Duplicate registration is not an error; this is the diagnostic signal a
/// caller can inspect instead of depending on log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
  /// The listener was newly subscribed.
  Registered,
  /// A listener with the same identity was already registered; the attempt
  /// was a no-op.
  AlreadyRegistered,
}

/// Sends messages to registered listeners, guaranteeing at most one live
/// subscription per listener identity.
pub struct MessagingService {
  bus: ObservableBus,
  registry: DashMap<ObserverId, Subscription>,
}

impl MessagingService {
  /// Creates a service with its own empty bus.
  pub fn new() -> Self {
    MessagingService {
      bus: ObservableBus::new(),
      registry: DashMap::new(),
    }
  }

  /// Broadcasts `message` to every registered listener, in registration
  /// order.
  pub fn send_message(&self, message: Arc<Message>) {
    debug!(?message, "sending message");
    self.bus.notify(message);
  }

  /// Registers `listener` to receive messages.
  ///
  /// If the listener's identity is already registered the fresh subscription
  /// handle is discarded (a no-op; the bus keeps the one live entry) and the
  /// call reports [`RegisterOutcome::AlreadyRegistered`].
  pub fn register_listener(&self, listener: Arc<dyn Listener>) -> RegisterOutcome {
    let id = listener.id();
    debug!(%id, "registering listener");
    let subscription = self.bus.subscribe(listener);

    // The entry API makes insert-if-absent atomic, so a racing duplicate
    // registration cannot end up with two registry entries.
    match self.registry.entry(id) {
      Entry::Vacant(vacant) => {
        vacant.insert(subscription);
        RegisterOutcome::Registered
      }
      Entry::Occupied(_) => {
        warn!(%id, "listener already registered, ignoring duplicate registration");
        drop(subscription);
        RegisterOutcome::AlreadyRegistered
      }
    }
  }

  /// Unregisters `listener`, releasing its subscription.
  ///
  /// Returns `false` without effect if the listener was never registered or
  /// has already been unregistered.
  pub fn unregister_listener(&self, listener: &dyn Listener) -> bool {
    let id = listener.id();
    debug!(%id, "unregistering listener");
    match self.registry.remove(&id) {
      Some((_, subscription)) => {
        subscription.unsubscribe();
        true
      }
      None => false,
    }
  }

  /// The number of listeners currently registered.
  pub fn listener_count(&self) -> usize {
    self.registry.len()
  }
}

impl Default for MessagingService {
  fn default() -> Self {
    MessagingService::new()
  }
}

impl fmt::Debug for MessagingService {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MessagingService")
      .field("registered", &self.registry.len())
      .field("bus", &self.bus)
      .finish()
  }
}
