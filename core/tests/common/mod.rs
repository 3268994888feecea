// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use seqflow::Handler;
use std::sync::Arc;
use tracing::Level;

// --- Helper for Tracing Setup (call once per test run if needed) ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Shared, ordered record of what the step functions of a test saw.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&self, entry: impl Into<String>) {
    self.0.lock().push(entry.into());
  }

  pub fn entries(&self) -> Vec<String> {
    self.0.lock().clone()
  }

  pub fn count(&self, entry: &str) -> usize {
    self.0.lock().iter().filter(|e| e.as_str() == entry).count()
  }
}

/// Slot a step function parks its handler in, so the test can signal it later.
#[derive(Clone)]
pub struct Parked<T>(Arc<Mutex<Option<Handler<T>>>>);

impl<T> Parked<T> {
  pub fn new() -> Self {
    Parked(Arc::new(Mutex::new(None)))
  }

  pub fn park(&self, handler: Handler<T>) {
    *self.0.lock() = Some(handler);
  }

  pub fn take(&self) -> Option<Handler<T>> {
    self.0.lock().take()
  }
}

// --- Common step function creators ---

/// Records `"<label>:<data>"` and advances with `data + add`.
pub fn adding_step(recorder: &Recorder, label: &'static str, add: i32) -> impl Fn(Option<i32>, Handler<i32>) + Send + Sync + 'static {
  let recorder = recorder.clone();
  move |data: Option<i32>, handler: Handler<i32>| {
    recorder.push(format!("{}:{:?}", label, data));
    handler.advance(data.unwrap_or(0) + add);
  }
}

/// Records `"<label>:<data>"` and fails with `code`.
pub fn failing_step(recorder: &Recorder, label: &'static str, code: i32) -> impl Fn(Option<i32>, Handler<i32>) + Send + Sync + 'static {
  let recorder = recorder.clone();
  move |data: Option<i32>, handler: Handler<i32>| {
    recorder.push(format!("{}:{:?}", label, data));
    handler.fail(code);
  }
}

/// Records `"<label>:<data>"` and never signals.
pub fn recording_step(recorder: &Recorder, label: &'static str) -> impl Fn(Option<i32>, Handler<i32>) + Send + Sync + 'static {
  let recorder = recorder.clone();
  move |data: Option<i32>, _handler: Handler<i32>| {
    recorder.push(format!("{}:{:?}", label, data));
  }
}

/// Records `"<label>:<data>"` and parks the handler for a later signal.
pub fn parking_step(recorder: &Recorder, label: &'static str, parked: &Parked<i32>) -> impl Fn(Option<i32>, Handler<i32>) + Send + Sync + 'static {
  let recorder = recorder.clone();
  let parked = parked.clone();
  move |data: Option<i32>, handler: Handler<i32>| {
    recorder.push(format!("{}:{:?}", label, data));
    parked.park(handler);
  }
}
