// src/error.rs

use core::fmt;
use std::sync::Arc;

/// A caller-supplied terminal error, as handed to [`Messenger::close_with_error`]
/// or broadcast through [`ObservableBus::error`].
///
/// The same allocation is shared with every reader or listener that observes the
/// fault, so fault identity can be checked with [`Arc::ptr_eq`].
///
/// [`Messenger::close_with_error`]: crate::Messenger::close_with_error
/// [`ObservableBus::error`]: crate::ObservableBus::error
pub type Fault = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned by `try_write` operations on a messenger when the item
/// could not be accepted immediately. The rejected item is returned.
#[derive(Clone)]
pub enum TryWriteError<T> {
  /// The buffer is at capacity and no reader has freed a slot.
  Full(T),
  /// The write-side cancellation flag has been raised.
  Cancelled(T),
  /// The messenger was closed without an error.
  Closed(T),
  /// The messenger was closed with the given fault.
  Faulted(T, Fault),
}

impl<T> TryWriteError<T> {
  /// Consumes the error, returning the rejected item.
  #[inline]
  pub fn into_inner(self) -> T {
    match self {
      TryWriteError::Full(v) => v,
      TryWriteError::Cancelled(v) => v,
      TryWriteError::Closed(v) => v,
      TryWriteError::Faulted(v, _) => v,
    }
  }
}

impl<T> fmt::Debug for TryWriteError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TryWriteError::Full(_) => write!(f, "TryWriteError::Full(..)"),
      TryWriteError::Cancelled(_) => write!(f, "TryWriteError::Cancelled(..)"),
      TryWriteError::Closed(_) => write!(f, "TryWriteError::Closed(..)"),
      TryWriteError::Faulted(_, fault) => write!(f, "TryWriteError::Faulted(.., {fault:?})"),
    }
  }
}

impl<T> fmt::Display for TryWriteError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TryWriteError::Full(_) => f.write_str("messenger full"),
      TryWriteError::Cancelled(_) => f.write_str("write side cancelled"),
      TryWriteError::Closed(_) => f.write_str("messenger closed"),
      TryWriteError::Faulted(_, fault) => write!(f, "messenger closed with error: {fault}"),
    }
  }
}

impl<T> std::error::Error for TryWriteError<T> {}

/// Error returned by the awaitable `write` operation.
#[derive(Debug, Clone)]
pub enum WriteError {
  /// The write-side cancellation flag has been raised.
  Cancelled,
  /// The messenger was closed without an error before space became available.
  Closed,
  /// The messenger was closed with the given fault before space became available.
  Faulted(Fault),
}

impl PartialEq for WriteError {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (WriteError::Cancelled, WriteError::Cancelled) => true,
      (WriteError::Closed, WriteError::Closed) => true,
      (WriteError::Faulted(a), WriteError::Faulted(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}
impl Eq for WriteError {}

impl fmt::Display for WriteError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WriteError::Cancelled => f.write_str("write side cancelled"),
      WriteError::Closed => f.write_str("messenger closed"),
      WriteError::Faulted(fault) => write!(f, "messenger closed with error: {fault}"),
    }
  }
}
impl std::error::Error for WriteError {}

/// Error returned by `try_read` operations on a messenger when an item
/// could not be produced immediately.
#[derive(Debug, Clone)]
pub enum TryReadError {
  /// The buffer is empty but the messenger is still open.
  Empty,
  /// The read-side cancellation flag has been raised.
  Cancelled,
  /// The messenger was closed without an error and the buffer is drained.
  Closed,
  /// The messenger was closed with the given fault and the buffer is drained.
  Faulted(Fault),
}

impl PartialEq for TryReadError {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (TryReadError::Empty, TryReadError::Empty) => true,
      (TryReadError::Cancelled, TryReadError::Cancelled) => true,
      (TryReadError::Closed, TryReadError::Closed) => true,
      (TryReadError::Faulted(a), TryReadError::Faulted(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}
impl Eq for TryReadError {}

impl fmt::Display for TryReadError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TryReadError::Empty => f.write_str("messenger empty"),
      TryReadError::Cancelled => f.write_str("read side cancelled"),
      TryReadError::Closed => f.write_str("messenger closed and drained"),
      TryReadError::Faulted(fault) => write!(f, "messenger closed with error: {fault}"),
    }
  }
}
impl std::error::Error for TryReadError {}

/// Error returned by the awaitable `read` operation.
///
/// An orderly end of the queue is not an error: `read` resolves to `Ok(None)`
/// once the messenger is closed without a fault and the buffer is drained.
#[derive(Debug, Clone)]
pub enum ReadError {
  /// The read-side cancellation flag has been raised.
  Cancelled,
  /// The messenger was closed with the given fault and the buffer is drained.
  Faulted(Fault),
}

impl PartialEq for ReadError {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (ReadError::Cancelled, ReadError::Cancelled) => true,
      (ReadError::Faulted(a), ReadError::Faulted(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}
impl Eq for ReadError {}

impl fmt::Display for ReadError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReadError::Cancelled => f.write_str("read side cancelled"),
      ReadError::Faulted(fault) => write!(f, "messenger closed with error: {fault}"),
    }
  }
}
impl std::error::Error for ReadError {}

/// Error returned when attempting to close an already closed messenger.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CloseError;
impl std::error::Error for CloseError {}
impl fmt::Display for CloseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "messenger is already closed")
  }
}
