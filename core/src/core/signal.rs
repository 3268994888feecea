// seqflow/src/core/signal.rs

//! Completion signals a step reports through its `Handler`.

/// Names one of the three continuation slots of a `Handler`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
  Advance,
  Fail,
  ChangeState,
}

/// A completion report carrying its payload.
///
/// `Advance` and `Fail` carry the data handed to the next step (or error
/// handler). `ChangeState` carries the name of the chain to switch to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal<T> {
  Advance(T),
  Fail(T),
  ChangeState(String),
}

impl<T> Signal<T> {
  pub fn slot(&self) -> Slot {
    match self {
      Signal::Advance(_) => Slot::Advance,
      Signal::Fail(_) => Slot::Fail,
      Signal::ChangeState(_) => Slot::ChangeState,
    }
  }
}
