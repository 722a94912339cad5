// src/messenger/core.rs

//! The shared state and poll logic of the bounded messenger.
//!
//! Design follows the lock-based channel core used across this codebase:
//!
//! 1. **Central mutex**: a `parking_lot::Mutex` guards the buffer, the closed
//!    flag and the parked-waker queues.
//! 2. **Sticky cancellation flags**: the write side and the read side each
//!    have an `AtomicBool` raised at most once. The flags are checked on the
//!    fast path before locking and re-checked under the lock before parking,
//!    so a cancellation racing with a suspension cannot be missed.
//! 3. **Wake outside the lock**: wakers are always drained under the lock and
//!    invoked after it is released.
//! 4. **Identified waiters**: each parked waker carries a token the parked
//!    future remembers. A future dropped while parked removes its own entry,
//!    and a future dropped after its entry was popped (woken but never
//!    re-polled) forwards the wake to the next waiter on its side. Without
//!    this, a wake-one discipline could spend a wake on a dead future and
//!    strand a live sibling.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{CloseError, Fault, ReadError, TryReadError, TryWriteError, WriteError};

/// A parked waker plus the token its future holds on to.
pub(crate) struct Waiter {
  token: u64,
  waker: Waker,
}

/// The mutex-protected core of a messenger.
pub(crate) struct MessengerState<T> {
  /// FIFO buffer of written items, capped at the messenger's capacity.
  pub(crate) queue: VecDeque<T>,
  /// Set once by the first `close`; never unset.
  pub(crate) closed: bool,
  /// The terminal error supplied to `close_with_error`, if any.
  pub(crate) fault: Option<Fault>,
  /// Writers parked on a full buffer.
  pub(crate) waiting_writers: VecDeque<Waiter>,
  /// Readers parked on an empty buffer.
  pub(crate) waiting_readers: VecDeque<Waiter>,
  /// Source of waiter tokens, unique within this messenger.
  next_token: u64,
}

/// Parks the current task: refreshes the waker of an existing entry, or
/// enqueues a new one and hands its token back through `park`.
fn park_waiter(
  queue: &mut VecDeque<Waiter>,
  next_token: &mut u64,
  park: &mut Option<u64>,
  waker: &Waker,
) {
  if let Some(token) = *park {
    if let Some(waiter) = queue.iter_mut().find(|w| w.token == token) {
      waiter.waker = waker.clone();
      return;
    }
  }
  let token = *next_token;
  *next_token += 1;
  queue.push_back(Waiter {
    token,
    waker: waker.clone(),
  });
  *park = Some(token);
}

/// Releases a completed future's parked entry, if it is still queued.
fn forget_waiter(queue: &mut VecDeque<Waiter>, park: &mut Option<u64>) {
  if let Some(token) = park.take() {
    if let Some(pos) = queue.iter().position(|w| w.token == token) {
      let _ = queue.remove(pos);
    }
  }
}

/// The shared owner of a messenger's state, wrapped in an `Arc` by the
/// public handle.
pub(crate) struct MessengerShared<T> {
  pub(crate) state: Mutex<MessengerState<T>>,
  pub(crate) capacity: usize,
  pub(crate) write_cancelled: AtomicBool,
  pub(crate) read_cancelled: AtomicBool,
}

impl<T: Send> MessengerShared<T> {
  pub(crate) fn new(capacity: usize) -> Self {
    MessengerShared {
      state: Mutex::new(MessengerState {
        queue: VecDeque::with_capacity(capacity),
        closed: false,
        fault: None,
        waiting_writers: VecDeque::new(),
        waiting_readers: VecDeque::new(),
        next_token: 0,
      }),
      capacity,
      write_cancelled: AtomicBool::new(false),
      read_cancelled: AtomicBool::new(false),
    }
  }

  /// Core logic of a non-suspending write: append to the buffer if the write
  /// side is live and a slot is free, waking one parked reader on success.
  pub(crate) fn try_write_core(&self, item: T) -> Result<(), TryWriteError<T>> {
    if self.write_cancelled.load(Ordering::Acquire) {
      return Err(TryWriteError::Cancelled(item));
    }

    let woken_reader;
    {
      let mut state = self.state.lock();
      if state.closed {
        return match state.fault.clone() {
          Some(fault) => Err(TryWriteError::Faulted(item, fault)),
          None => Err(TryWriteError::Closed(item)),
        };
      }
      if state.queue.len() >= self.capacity {
        return Err(TryWriteError::Full(item));
      }
      state.queue.push_back(item);
      woken_reader = state.waiting_readers.pop_front();
    }
    if let Some(waiter) = woken_reader {
      waiter.waker.wake();
    }
    Ok(())
  }

  /// Core logic of a non-suspending read: take the head item if the read side
  /// is live and the buffer is non-empty, waking one parked writer on
  /// success. Buffered items remain readable after close (drain semantics).
  pub(crate) fn try_read_core(&self) -> Result<T, TryReadError> {
    if self.read_cancelled.load(Ordering::Acquire) {
      return Err(TryReadError::Cancelled);
    }

    let item;
    let woken_writer;
    {
      let mut state = self.state.lock();
      match state.queue.pop_front() {
        Some(head) => {
          item = head;
          woken_writer = state.waiting_writers.pop_front();
        }
        None => {
          if state.closed {
            return match state.fault.clone() {
              Some(fault) => Err(TryReadError::Faulted(fault)),
              None => Err(TryReadError::Closed),
            };
          }
          return Err(TryReadError::Empty);
        }
      }
    }
    if let Some(waiter) = woken_writer {
      waiter.waker.wake();
    }
    Ok(item)
  }

  /// Poll body of a suspended write. `slot` holds the item between polls;
  /// `park` holds the token of this future's queued waker while it is parked.
  ///
  /// Every outcome is decided under one lock acquisition, so the parked entry
  /// is released on the same pass that completes the future.
  pub(crate) fn poll_write(
    &self,
    cx: &mut Context<'_>,
    slot: &mut Option<T>,
    park: &mut Option<u64>,
  ) -> Poll<Result<(), WriteError>> {
    let item = match slot.take() {
      Some(item) => item,
      // A completed future was polled again.
      None => return Poll::Ready(Ok(())),
    };

    let woken_reader;
    {
      let mut guard = self.state.lock();
      let state = &mut *guard;
      if self.write_cancelled.load(Ordering::Acquire) {
        forget_waiter(&mut state.waiting_writers, park);
        return Poll::Ready(Err(WriteError::Cancelled));
      }
      if state.closed {
        forget_waiter(&mut state.waiting_writers, park);
        return match state.fault.clone() {
          Some(fault) => Poll::Ready(Err(WriteError::Faulted(fault))),
          None => Poll::Ready(Err(WriteError::Closed)),
        };
      }
      if state.queue.len() >= self.capacity {
        park_waiter(
          &mut state.waiting_writers,
          &mut state.next_token,
          park,
          cx.waker(),
        );
        *slot = Some(item);
        return Poll::Pending;
      }
      state.queue.push_back(item);
      forget_waiter(&mut state.waiting_writers, park);
      woken_reader = state.waiting_readers.pop_front();
    }
    if let Some(waiter) = woken_reader {
      waiter.waker.wake();
    }
    Poll::Ready(Ok(()))
  }

  /// Poll body of a suspended read. Resolves to `Ok(None)` once the
  /// messenger is closed without a fault and the buffer is drained.
  pub(crate) fn poll_read(
    &self,
    cx: &mut Context<'_>,
    park: &mut Option<u64>,
  ) -> Poll<Result<Option<T>, ReadError>> {
    let item;
    let woken_writer;
    {
      let mut guard = self.state.lock();
      let state = &mut *guard;
      if self.read_cancelled.load(Ordering::Acquire) {
        forget_waiter(&mut state.waiting_readers, park);
        return Poll::Ready(Err(ReadError::Cancelled));
      }
      match state.queue.pop_front() {
        Some(head) => {
          item = head;
          forget_waiter(&mut state.waiting_readers, park);
          woken_writer = state.waiting_writers.pop_front();
        }
        None => {
          if state.closed {
            forget_waiter(&mut state.waiting_readers, park);
            return match state.fault.clone() {
              Some(fault) => Poll::Ready(Err(ReadError::Faulted(fault))),
              None => Poll::Ready(Ok(None)),
            };
          }
          park_waiter(
            &mut state.waiting_readers,
            &mut state.next_token,
            park,
            cx.waker(),
          );
          return Poll::Pending;
        }
      }
    }
    if let Some(waiter) = woken_writer {
      waiter.waker.wake();
    }
    Poll::Ready(Ok(Some(item)))
  }

  /// Cleanup for a write future dropped while it may still be parked.
  ///
  /// If the entry is still queued it is simply removed. If it is gone, a wake
  /// was spent on this future after it was popped; that wake is forwarded to
  /// the next parked writer so the freed slot is not lost.
  pub(crate) fn drop_write_waiter(&self, park: &mut Option<u64>) {
    let token = match park.take() {
      Some(token) => token,
      None => return,
    };
    let forwarded;
    {
      let mut state = self.state.lock();
      if let Some(pos) = state.waiting_writers.iter().position(|w| w.token == token) {
        let _ = state.waiting_writers.remove(pos);
        return;
      }
      forwarded = state.waiting_writers.pop_front();
    }
    if let Some(waiter) = forwarded {
      waiter.waker.wake();
    }
  }

  /// Cleanup for a read future (or stream) dropped while it may still be
  /// parked. Mirrors [`drop_write_waiter`](Self::drop_write_waiter).
  pub(crate) fn drop_read_waiter(&self, park: &mut Option<u64>) {
    let token = match park.take() {
      Some(token) => token,
      None => return,
    };
    let forwarded;
    {
      let mut state = self.state.lock();
      if let Some(pos) = state.waiting_readers.iter().position(|w| w.token == token) {
        let _ = state.waiting_readers.remove(pos);
        return;
      }
      forwarded = state.waiting_readers.pop_front();
    }
    if let Some(waiter) = forwarded {
      waiter.waker.wake();
    }
  }

  /// Raises the sticky write-side cancellation flag and wakes every parked
  /// writer so it can observe the flag. Idempotent.
  pub(crate) fn cancel_write_core(&self) {
    if self
      .write_cancelled
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
      .is_err()
    {
      return;
    }
    debug!("write side cancelled");
    let waiters = std::mem::take(&mut self.state.lock().waiting_writers);
    for waiter in waiters {
      waiter.waker.wake();
    }
  }

  /// Raises the sticky read-side cancellation flag and wakes every parked
  /// reader. Idempotent.
  pub(crate) fn cancel_read_core(&self) {
    if self
      .read_cancelled
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
      .is_err()
    {
      return;
    }
    debug!("read side cancelled");
    let waiters = std::mem::take(&mut self.state.lock().waiting_readers);
    for waiter in waiters {
      waiter.waker.wake();
    }
  }

  /// One-shot close; the first call wins. Wakes every parked future on both
  /// sides so writers can fail and readers can drain.
  pub(crate) fn close_core(&self, fault: Option<Fault>) -> Result<(), CloseError> {
    let writers;
    let readers;
    {
      let mut state = self.state.lock();
      if state.closed {
        return Err(CloseError);
      }
      debug!(faulted = fault.is_some(), "messenger closed");
      state.closed = true;
      state.fault = fault;
      writers = std::mem::take(&mut state.waiting_writers);
      readers = std::mem::take(&mut state.waiting_readers);
    }
    for waiter in writers {
      waiter.waker.wake();
    }
    for waiter in readers {
      waiter.waker.wake();
    }
    Ok(())
  }
}
