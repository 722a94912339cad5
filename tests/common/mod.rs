#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use courier::{Fault, Listener, Message, ObserverId};

/// One delivered callback, as seen by a [`Recorder`].
#[derive(Clone)]
pub enum Event {
  Next(Arc<Message>),
  Completed,
  Errored(Fault),
}

/// A log shared by every recorder in a test, so cross-listener delivery order
/// is observable.
pub type EventLog = Arc<Mutex<Vec<(&'static str, Event)>>>;

pub fn event_log() -> EventLog {
  Arc::new(Mutex::new(Vec::new()))
}

/// A listener that appends every callback to a shared log.
pub struct Recorder {
  id: ObserverId,
  label: &'static str,
  log: EventLog,
}

impl Recorder {
  pub fn new(label: &'static str, log: &EventLog) -> Arc<Self> {
    Arc::new(Recorder {
      id: ObserverId::next(),
      label,
      log: Arc::clone(log),
    })
  }
}

impl Listener for Recorder {
  fn id(&self) -> ObserverId {
    self.id
  }

  fn on_next(&self, message: Arc<Message>) {
    self.log.lock().unwrap().push((self.label, Event::Next(message)));
  }

  fn on_completed(&self) {
    self.log.lock().unwrap().push((self.label, Event::Completed));
  }

  fn on_error(&self, error: Fault) {
    self.log.lock().unwrap().push((self.label, Event::Errored(error)));
  }
}

/// The labels of logged `on_next` deliveries, in order.
pub fn delivery_order(log: &EventLog) -> Vec<&'static str> {
  log
    .lock()
    .unwrap()
    .iter()
    .filter(|(_, event)| matches!(event, Event::Next(_)))
    .map(|(label, _)| *label)
    .collect()
}

pub fn fault(text: &str) -> Fault {
  Arc::new(std::io::Error::new(std::io::ErrorKind::Other, text.to_string()))
}
