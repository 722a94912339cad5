mod common;
use common::fault;

use courier::error::{ReadError, TryReadError, TryWriteError, WriteError};
use courier::Messenger;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::{sleep, timeout};

const SHORT: Duration = Duration::from_millis(50);

#[tokio::test]
async fn fifo_order_within_capacity() {
  let messenger = Messenger::with_capacity(16);
  for i in 0..16 {
    messenger.write(i).await.unwrap();
  }
  for i in 0..16 {
    assert_eq!(messenger.read().await.unwrap(), Some(i));
  }
  assert!(messenger.is_empty());
  assert!(!messenger.is_closed());
}

#[tokio::test]
async fn write_suspends_while_full_until_a_read_frees_space() {
  let messenger = Messenger::with_capacity(2);
  messenger.write("a").await.unwrap();
  messenger.write("b").await.unwrap();
  assert!(messenger.is_full());

  let writer = messenger.clone();
  let pending = tokio::spawn(async move { writer.write("c").await });

  // The capacity+1'th write must not complete while no read occurs.
  sleep(SHORT).await;
  assert!(!pending.is_finished());

  assert_eq!(messenger.read().await.unwrap(), Some("a"));
  timeout(SHORT, pending)
    .await
    .expect("write should complete once space frees up")
    .unwrap()
    .unwrap();

  assert_eq!(messenger.read().await.unwrap(), Some("b"));
  assert_eq!(messenger.read().await.unwrap(), Some("c"));
  assert!(messenger.is_empty());
  assert!(!messenger.is_closed());
}

#[tokio::test]
async fn read_suspends_while_empty_until_a_write_arrives() {
  let messenger = Messenger::with_capacity(4);
  let reader = messenger.clone();
  let pending = tokio::spawn(async move { reader.read().await });

  sleep(SHORT).await;
  assert!(!pending.is_finished());

  messenger.write(7u32).await.unwrap();
  let got = timeout(SHORT, pending).await.unwrap().unwrap().unwrap();
  assert_eq!(got, Some(7));
}

#[tokio::test]
async fn cancel_write_is_sticky_and_leaves_the_read_side_alone() {
  let messenger = Messenger::with_capacity(8);
  messenger.write(1).await.unwrap();
  messenger.write(2).await.unwrap();

  messenger.cancel_write();
  messenger.cancel_write(); // idempotent

  assert_eq!(messenger.write(3).await, Err(WriteError::Cancelled));
  assert!(matches!(messenger.try_write(3), Err(TryWriteError::Cancelled(3))));

  // Buffered items are still readable after write-side cancellation.
  assert_eq!(messenger.read().await.unwrap(), Some(1));
  assert_eq!(messenger.read().await.unwrap(), Some(2));
  assert!(!messenger.is_closed());
}

#[tokio::test]
async fn cancel_write_wakes_a_suspended_write() {
  let messenger = Messenger::with_capacity(1);
  messenger.write("fill").await.unwrap();

  let writer = messenger.clone();
  let pending = tokio::spawn(async move { writer.write("parked").await });
  sleep(SHORT).await;
  assert!(!pending.is_finished());

  messenger.cancel_write();
  let result = timeout(SHORT, pending).await.unwrap().unwrap();
  assert_eq!(result, Err(WriteError::Cancelled));
}

#[tokio::test]
async fn dropped_suspended_write_does_not_strand_its_sibling() {
  let messenger = Messenger::with_capacity(1);
  messenger.write(0).await.unwrap();

  // Park one writer, then drop it mid-suspension.
  let doomed_writer = messenger.clone();
  let doomed = tokio::spawn(async move { doomed_writer.write(1).await });
  sleep(SHORT).await;
  doomed.abort();
  let _ = doomed.await;

  // A second writer parks behind where the dropped one used to be.
  let writer = messenger.clone();
  let pending = tokio::spawn(async move { writer.write(2).await });
  sleep(SHORT).await;
  assert!(!pending.is_finished());

  // Freeing one slot must reach the live writer, not the dead one's waker.
  assert_eq!(messenger.read().await.unwrap(), Some(0));
  timeout(SHORT, pending)
    .await
    .expect("surviving write should be woken")
    .unwrap()
    .unwrap();
  assert_eq!(messenger.read().await.unwrap(), Some(2));
}

#[tokio::test]
async fn dropped_suspended_read_does_not_strand_its_sibling() {
  let messenger = Messenger::<u8>::with_capacity(4);

  let doomed_reader = messenger.clone();
  let doomed = tokio::spawn(async move { doomed_reader.read().await });
  sleep(SHORT).await;
  doomed.abort();
  let _ = doomed.await;

  let reader = messenger.clone();
  let pending = tokio::spawn(async move { reader.read().await });
  sleep(SHORT).await;

  messenger.write(5).await.unwrap();
  let got = timeout(SHORT, pending)
    .await
    .expect("surviving read should be woken")
    .unwrap()
    .unwrap();
  assert_eq!(got, Some(5));
}

#[tokio::test]
async fn cancel_read_fails_a_suspended_read_and_writes_continue() {
  let messenger = Messenger::<u8>::with_capacity(4);
  let reader = messenger.clone();
  let pending = tokio::spawn(async move { reader.read().await });
  sleep(SHORT).await;

  messenger.cancel_read();
  let result = timeout(SHORT, pending).await.unwrap().unwrap();
  assert_eq!(result, Err(ReadError::Cancelled));
  assert_eq!(messenger.try_read(), Err(TryReadError::Cancelled));

  // The write side is unaffected.
  messenger.write(9).await.unwrap();
  assert_eq!(messenger.len(), 1);
}

#[tokio::test]
async fn close_drains_buffered_items_then_reports_end_of_sequence() {
  let messenger = Messenger::with_capacity(8);
  messenger.write("x").await.unwrap();
  messenger.write("y").await.unwrap();

  messenger.close().unwrap();
  assert!(messenger.is_closed());
  assert_eq!(messenger.write("z").await, Err(WriteError::Closed));

  assert_eq!(messenger.read().await.unwrap(), Some("x"));
  assert_eq!(messenger.read().await.unwrap(), Some("y"));
  assert_eq!(messenger.read().await.unwrap(), None);
  // End-of-sequence is repeatable.
  assert_eq!(messenger.read().await.unwrap(), None);
}

#[tokio::test]
async fn close_with_error_faults_readers_once_drained() {
  let messenger = Messenger::with_capacity(8);
  messenger.write(1).await.unwrap();

  let boom = fault("boom");
  messenger.close_with_error(Arc::clone(&boom)).unwrap();

  // The buffered item drains first; only then is the fault surfaced.
  assert_eq!(messenger.read().await.unwrap(), Some(1));
  match messenger.read().await {
    Err(ReadError::Faulted(seen)) => assert!(Arc::ptr_eq(&seen, &boom)),
    other => panic!("expected fault, got {other:?}"),
  }
  match messenger.write(2).await {
    Err(WriteError::Faulted(seen)) => assert!(Arc::ptr_eq(&seen, &boom)),
    other => panic!("expected fault, got {other:?}"),
  }
}

#[tokio::test]
async fn close_is_one_shot_and_the_first_call_wins() {
  let messenger = Messenger::<u8>::with_capacity(4);
  messenger.close().unwrap();
  assert!(messenger.close().is_err());
  // A later faulted close does not retrofit an error onto the queue.
  assert!(messenger.close_with_error(fault("late")).is_err());
  assert_eq!(messenger.read().await.unwrap(), None);
}

#[tokio::test]
async fn close_wakes_suspended_operations_on_both_sides() {
  let messenger = Messenger::with_capacity(1);
  messenger.write(0).await.unwrap();

  let writer = messenger.clone();
  let parked_write = tokio::spawn(async move { writer.write(1).await });
  sleep(SHORT).await;

  messenger.close().unwrap();
  let write_result = timeout(SHORT, parked_write).await.unwrap().unwrap();
  assert_eq!(write_result, Err(WriteError::Closed));

  // A reader parked on an already drained, closed messenger resolves to None.
  assert_eq!(messenger.read().await.unwrap(), Some(0));
  assert_eq!(messenger.read().await.unwrap(), None);
}

#[tokio::test]
async fn try_write_and_try_read_report_full_and_empty() {
  let messenger = Messenger::with_capacity(2);
  assert_eq!(messenger.try_read(), Err(TryReadError::Empty));

  messenger.try_write(1).unwrap();
  messenger.try_write(2).unwrap();
  let rejected = match messenger.try_write(3) {
    Err(TryWriteError::Full(v)) => v,
    other => panic!("expected full, got {other:?}"),
  };
  assert_eq!(rejected, 3);

  assert_eq!(messenger.try_read().unwrap(), 1);
  assert_eq!(messenger.try_read().unwrap(), 2);
  assert_eq!(messenger.try_read(), Err(TryReadError::Empty));
}

#[tokio::test]
async fn capacity_two_interleave_scenario() {
  let messenger = Messenger::with_capacity(2);
  messenger.write("a").await.unwrap();
  messenger.write("b").await.unwrap();

  let writer = messenger.clone();
  let write_c = tokio::spawn(async move { writer.write("c").await });
  sleep(SHORT).await;
  assert!(!write_c.is_finished());

  assert_eq!(messenger.read().await.unwrap(), Some("a"));
  timeout(SHORT, write_c).await.unwrap().unwrap().unwrap();
  assert_eq!(messenger.read().await.unwrap(), Some("b"));
  assert_eq!(messenger.read().await.unwrap(), Some("c"));

  // Final state: empty and still open.
  assert!(messenger.is_empty());
  assert!(!messenger.is_closed());
}

#[tokio::test]
async fn stream_yields_buffered_items_and_ends_on_close() {
  let messenger = Messenger::with_capacity(8);
  for i in 0..5 {
    messenger.write(i).await.unwrap();
  }
  messenger.close().unwrap();

  let collected: Vec<i32> = messenger.clone().collect().await;
  assert_eq!(collected, vec![0, 1, 2, 3, 4]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_and_consumers_deliver_everything_once() {
  const PRODUCERS: usize = 4;
  const ITEMS_PER_PRODUCER: usize = 500;

  let messenger = Messenger::with_capacity(8);
  let received = Arc::new(tokio::sync::Mutex::new(std::collections::HashSet::new()));

  let mut consumers = Vec::new();
  for _ in 0..2 {
    let reader = messenger.clone();
    let received = Arc::clone(&received);
    consumers.push(tokio::spawn(async move {
      while let Ok(Some(item)) = reader.read().await {
        assert!(received.lock().await.insert(item), "duplicate item received");
      }
    }));
  }

  let mut producers = Vec::new();
  for p in 0..PRODUCERS {
    let writer = messenger.clone();
    producers.push(tokio::spawn(async move {
      for i in 0..ITEMS_PER_PRODUCER {
        writer.write(p * ITEMS_PER_PRODUCER + i).await.unwrap();
      }
    }));
  }

  for handle in producers {
    handle.await.expect("producer task panicked");
  }
  messenger.close().unwrap();
  for handle in consumers {
    handle.await.expect("consumer task panicked");
  }

  assert_eq!(received.lock().await.len(), PRODUCERS * ITEMS_PER_PRODUCER);
}

#[test]
#[should_panic(expected = "capacity must be at least 1")]
fn zero_capacity_is_rejected() {
  let _ = Messenger::<u8>::with_capacity(0);
}
