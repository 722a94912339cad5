// src/messenger/async_impl.rs

//! The `Future`-based write and read operations of the messenger.

use futures_core::Stream;

use super::Messenger;
use crate::error::{ReadError, WriteError};

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

// --- WriteFuture ---

/// A future that completes once an item has been appended to the messenger's
/// buffer, or the write fails with [`WriteError`].
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct WriteFuture<'a, T: Send> {
  messenger: &'a Messenger<T>,
  // Wrapped in an Option so the item can be taken during the poll.
  item: Option<T>,
  // Token of this future's parked waker, while one is queued.
  park: Option<u64>,
}

impl<'a, T: Send> WriteFuture<'a, T> {
  pub(super) fn new(messenger: &'a Messenger<T>, item: T) -> Self {
    Self {
      messenger,
      item: Some(item),
      park: None,
    }
  }
}

// The future holds no self-references; it is safe to move between polls.
impl<'a, T: Send> Unpin for WriteFuture<'a, T> {}

impl<'a, T: Send> Future for WriteFuture<'a, T> {
  type Output = Result<(), WriteError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    this
      .messenger
      .shared
      .poll_write(cx, &mut this.item, &mut this.park)
  }
}

impl<'a, T: Send> Drop for WriteFuture<'a, T> {
  fn drop(&mut self) {
    self.messenger.shared.drop_write_waiter(&mut self.park);
  }
}

// --- ReadFuture ---

/// A future that resolves to the next item, to `Ok(None)` once the messenger
/// is closed and drained, or to a [`ReadError`].
#[must_use = "futures do nothing unless you .await or poll them"]
pub struct ReadFuture<'a, T: Send> {
  messenger: &'a Messenger<T>,
  park: Option<u64>,
}

impl<'a, T: Send> ReadFuture<'a, T> {
  pub(super) fn new(messenger: &'a Messenger<T>) -> Self {
    Self {
      messenger,
      park: None,
    }
  }
}

impl<'a, T: Send> Unpin for ReadFuture<'a, T> {}

impl<'a, T: Send> Future for ReadFuture<'a, T> {
  type Output = Result<Option<T>, ReadError>;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    this.messenger.shared.poll_read(cx, &mut this.park)
  }
}

impl<'a, T: Send> Drop for ReadFuture<'a, T> {
  fn drop(&mut self) {
    self.messenger.shared.drop_read_waiter(&mut self.park);
  }
}

impl<T: Send> Stream for Messenger<T> {
  type Item = T;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    // Terminal read outcomes (orderly close, cancellation, fault) all end the
    // stream.
    let this = self.get_mut();
    match this.shared.poll_read(cx, &mut this.stream_park) {
      Poll::Ready(Ok(item)) => Poll::Ready(item),
      Poll::Ready(Err(_)) => Poll::Ready(None),
      Poll::Pending => Poll::Pending,
    }
  }
}
