// seqflow/src/core/id.rs

//! Step identifiers and the sequence generator that hands them out.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifier of a step, unique and increasing within one [`StepIdGen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StepId(u64);

impl StepId {
  pub fn value(&self) -> u64 {
    self.0
  }
}

impl fmt::Display for StepId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "id{}", self.0)
  }
}

/// Monotonic sequence of [`StepId`]s.
///
/// Cloning shares the underlying counter. A `Registry` owns one generator and
/// passes it to every chain it creates, so ids never collide inside a registry.
/// Separate registries (or standalone chains) each start from zero unless a
/// generator is injected explicitly.
#[derive(Debug, Clone, Default)]
pub struct StepIdGen(Arc<AtomicU64>);

impl StepIdGen {
  pub fn new() -> Self {
    Self::default()
  }

  /// Starts the sequence at `first` instead of zero.
  pub fn starting_at(first: u64) -> Self {
    StepIdGen(Arc::new(AtomicU64::new(first)))
  }

  pub fn next_id(&self) -> StepId {
    StepId(self.0.fetch_add(1, Ordering::Relaxed))
  }
}
