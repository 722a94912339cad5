// src/messenger/mod.rs

//! A bounded, FIFO, wait-when-full messenger with independent cooperative
//! cancellation of the write side and the read side.
//!
//! One [`Messenger`] is one logical point-to-point channel: producers call
//! [`write`](Messenger::write), consumers call [`read`](Messenger::read), and
//! clones of the handle share the buffer, the close state and the two
//! cancellation flags. Both operations suspend cooperatively — `write` while
//! the buffer is full, `read` while it is empty — and resume on space or
//! availability, on cancellation of their own side, or on closure.
//!
//! Items are never dropped or overwritten: a full buffer makes writers wait
//! until a reader frees a slot, so every accepted item is eventually observed
//! unless the reader side walks away.
//!
//! ### Lifecycle
//!
//! A messenger is created open on both sides. [`close`](Messenger::close)
//! (or [`close_with_error`](Messenger::close_with_error)) is one-shot and
//! terminal: writes fail from then on, while reads drain the remaining
//! buffered items before reporting end-of-sequence (`Ok(None)`) or the stored
//! fault. Cancellation is per side and sticky; it fails that side's pending
//! and future operations without closing the queue or disturbing the other
//! side. There is no built-in timeout — race a cancellation against the
//! suspension to build a deadline.

mod async_impl;
mod core;

pub use async_impl::{ReadFuture, WriteFuture};

use self::core::MessengerShared;
use crate::error::{CloseError, Fault, TryReadError, TryWriteError};

use std::sync::Arc;

/// The buffer capacity used by [`Messenger::new`].
pub const DEFAULT_CAPACITY: usize = 100;

/// A capacity-limited FIFO queue with asynchronous write and read.
///
/// The handle is cheap to clone; clones drive the same queue. Any number of
/// concurrent writers and readers may share one messenger without external
/// locking.
pub struct Messenger<T: Send> {
  shared: Arc<MessengerShared<T>>,
  // Park token of this handle's `Stream` waker, if it is parked. Clones of
  // the handle poll the stream independently, so the token is per handle.
  stream_park: Option<u64>,
}

impl<T: Send> Messenger<T> {
  /// Creates a messenger with the default capacity of 100.
  pub fn new() -> Self {
    Self::with_capacity(DEFAULT_CAPACITY)
  }

  /// Creates a messenger with the given capacity.
  ///
  /// # Panics
  ///
  /// Panics if `capacity` is zero; the wait-when-full policy needs at least
  /// one buffer slot.
  pub fn with_capacity(capacity: usize) -> Self {
    assert!(capacity >= 1, "messenger capacity must be at least 1");
    Messenger {
      shared: Arc::new(MessengerShared::new(capacity)),
      stream_park: None,
    }
  }

  /// Appends `item` to the tail of the queue, suspending while the buffer is
  /// full.
  ///
  /// Resolves to `Err(WriteError::Cancelled)` if the write side is cancelled
  /// (checked at call time and on every wake while suspended), or to
  /// `Err(WriteError::Closed)` / `Err(WriteError::Faulted(..))` if the
  /// messenger is closed before space becomes available.
  pub fn write(&self, item: T) -> WriteFuture<'_, T> {
    WriteFuture::new(self, item)
  }

  /// Removes and returns the head item, suspending while the buffer is empty.
  ///
  /// Resolves to `Ok(None)` once the messenger is closed without an error and
  /// the buffer is drained; to `Err(ReadError::Faulted(..))` once it is
  /// closed with an error and drained; to `Err(ReadError::Cancelled)` if the
  /// read side is cancelled.
  pub fn read(&self) -> ReadFuture<'_, T> {
    ReadFuture::new(self)
  }

  /// Attempts to append `item` without suspending.
  pub fn try_write(&self, item: T) -> Result<(), TryWriteError<T>> {
    self.shared.try_write_core(item)
  }

  /// Attempts to remove the head item without suspending.
  pub fn try_read(&self) -> Result<T, TryReadError> {
    self.shared.try_read_core()
  }

  /// Raises the sticky write-side cancellation flag.
  ///
  /// Pending and future writes on this messenger fail with `Cancelled`; reads
  /// are unaffected and can still drain buffered items. Idempotent and safe
  /// to call concurrently with in-flight writes.
  pub fn cancel_write(&self) {
    self.shared.cancel_write_core();
  }

  /// Raises the sticky read-side cancellation flag.
  ///
  /// Pending and future reads on this messenger fail with `Cancelled`; writes
  /// are unaffected. Idempotent.
  pub fn cancel_read(&self) {
    self.shared.cancel_read_core();
  }

  /// Closes the messenger without an error. One-shot; the first close wins.
  ///
  /// Subsequent writes fail with `Closed`; reads drain the remaining buffered
  /// items and then report end-of-sequence.
  ///
  /// # Errors
  ///
  /// Returns `Err(CloseError)` if the messenger was already closed.
  pub fn close(&self) -> Result<(), CloseError> {
    self.shared.close_core(None)
  }

  /// Closes the messenger with a terminal error. One-shot; the first close
  /// (of either kind) wins.
  ///
  /// Readers that exhaust the buffer thereafter observe
  /// `ReadError::Faulted(fault)` instead of end-of-sequence.
  pub fn close_with_error(&self, fault: Fault) -> Result<(), CloseError> {
    self.shared.close_core(Some(fault))
  }

  /// The fixed capacity this messenger was created with.
  #[inline]
  pub fn capacity(&self) -> usize {
    self.shared.capacity
  }

  /// The number of items currently buffered.
  #[inline]
  pub fn len(&self) -> usize {
    self.shared.state.lock().queue.len()
  }

  /// Returns `true` if the buffer is empty.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns `true` if the buffer is at capacity.
  #[inline]
  pub fn is_full(&self) -> bool {
    self.len() == self.shared.capacity
  }

  /// Returns `true` once the messenger has been closed (with or without an
  /// error). Cancellation does not close the messenger.
  pub fn is_closed(&self) -> bool {
    self.shared.state.lock().closed
  }
}

impl<T: Send> Clone for Messenger<T> {
  fn clone(&self) -> Self {
    Messenger {
      shared: Arc::clone(&self.shared),
      stream_park: None,
    }
  }
}

impl<T: Send> Drop for Messenger<T> {
  fn drop(&mut self) {
    // Only does work if this handle was parked as a `Stream`.
    self.shared.drop_read_waiter(&mut self.stream_park);
  }
}

impl<T: Send> Default for Messenger<T> {
  fn default() -> Self {
    Messenger::new()
  }
}

impl<T: Send> std::fmt::Debug for Messenger<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = self.shared.state.lock();
    f.debug_struct("Messenger")
      .field("capacity", &self.shared.capacity)
      .field("len", &state.queue.len())
      .field("closed", &state.closed)
      .finish()
  }
}
