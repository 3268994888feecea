// seqflow/src/core/handler.rs

//! Defines `Handler<T>`, the one-shot dispatcher owned by every step.
//!
//! A handler holds three continuation slots (advance, fail, change state) and
//! a lock. The first accepted signal locks the handler; every later signal is
//! refused without side effects until the owning chain unlocks it again on its
//! next run. This turns a step function's completion report, synchronous or
//! not, into an at-most-once event per activation.

use crate::core::signal::{Signal, Slot};
use crate::core::step::StepInfo;
use crate::error::{SequencerError, SequencerResult};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{event, Level};

/// Continuation for the advance and fail slots.
pub type PayloadFn<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

/// Continuation for the change-state slot. Receives the target chain name.
pub type StateFn = Arc<dyn Fn(&str) -> SequencerResult<()> + Send + Sync + 'static>;

/// A replacement continuation for one slot, see [`Handler::attach`].
pub enum Callback<T> {
  Advance(PayloadFn<T>),
  Fail(PayloadFn<T>),
  ChangeState(StateFn),
}

impl<T> Callback<T> {
  pub fn advance(f: impl Fn(T) + Send + Sync + 'static) -> Self {
    Callback::Advance(Arc::new(f))
  }

  pub fn fail(f: impl Fn(T) + Send + Sync + 'static) -> Self {
    Callback::Fail(Arc::new(f))
  }

  pub fn change_state(f: impl Fn(&str) -> SequencerResult<()> + Send + Sync + 'static) -> Self {
    Callback::ChangeState(Arc::new(f))
  }

  pub fn slot(&self) -> Slot {
    match self {
      Callback::Advance(_) => Slot::Advance,
      Callback::Fail(_) => Slot::Fail,
      Callback::ChangeState(_) => Slot::ChangeState,
    }
  }
}

struct Slots<T> {
  locked: bool,
  advance: PayloadFn<T>,
  fail: PayloadFn<T>,
  change_state: StateFn,
}

struct HandlerInner<T> {
  step: StepInfo,
  slots: Mutex<Slots<T>>,
}

/// Cheaply cloneable handle to a step's dispatcher.
///
/// Step functions receive a clone and may keep it, move it to another thread
/// or into an async task, and signal whenever the work completes.
pub struct Handler<T> {
  inner: Arc<HandlerInner<T>>,
}

impl<T> Clone for Handler<T> {
  fn clone(&self) -> Self {
    Handler {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T> fmt::Debug for Handler<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Handler")
      .field("step", &self.inner.step)
      .field("locked", &self.is_locked())
      .finish()
  }
}

impl<T: 'static> Handler<T> {
  /// Creates an unlocked handler whose slots are all no-ops.
  pub fn new(step: StepInfo) -> Self {
    Self::with_slots(step, Arc::new(|_: T| {}), Arc::new(|_: T| {}), Arc::new(|_: &str| Ok(())))
  }

  pub(crate) fn with_slots(step: StepInfo, advance: PayloadFn<T>, fail: PayloadFn<T>, change_state: StateFn) -> Self {
    Handler {
      inner: Arc::new(HandlerInner {
        step,
        slots: Mutex::new(Slots {
          locked: false,
          advance,
          fail,
          change_state,
        }),
      }),
    }
  }
}

impl<T> Handler<T> {
  /// The step this handler belongs to. This is the default context of every
  /// step function that was not given an explicit one.
  pub fn step(&self) -> &StepInfo {
    &self.inner.step
  }

  pub fn is_locked(&self) -> bool {
    self.inner.slots.lock().locked
  }

  pub fn lock(&self) {
    self.inner.slots.lock().locked = true;
  }

  pub fn unlock(&self) {
    self.inner.slots.lock().locked = false;
  }

  /// Replaces the continuation of one slot. Refused (returns `false`) while locked.
  pub fn attach(&self, callback: Callback<T>) -> bool {
    let mut slots = self.inner.slots.lock();
    if slots.locked {
      return false;
    }
    match callback {
      Callback::Advance(f) => slots.advance = f,
      Callback::Fail(f) => slots.fail = f,
      Callback::ChangeState(f) => slots.change_state = f,
    }
    true
  }

  /// Dispatches a signal to the matching slot.
  ///
  /// Returns `Ok(false)` without side effects if the handler is locked.
  /// Otherwise the handler is locked and the slot's continuation runs; the
  /// lock is taken before the continuation so that a continuation re-entering
  /// the engine (e.g. restarting this chain) sees a consistent state.
  /// Only the change-state continuation can produce an error. When it reports
  /// `UnknownName` no chain was switched and the handler is unlocked again.
  pub fn signal(&self, signal: Signal<T>) -> SequencerResult<bool> {
    let mut slots = self.inner.slots.lock();
    if slots.locked {
      event!(Level::TRACE, step_id = %self.inner.step.id(), slot = ?signal.slot(), "Signal refused, handler locked.");
      return Ok(false);
    }
    slots.locked = true;

    match signal {
      Signal::Advance(data) => {
        let f = Arc::clone(&slots.advance);
        drop(slots);
        f(data);
        Ok(true)
      }
      Signal::Fail(data) => {
        let f = Arc::clone(&slots.fail);
        drop(slots);
        f(data);
        Ok(true)
      }
      Signal::ChangeState(target) => {
        let f = Arc::clone(&slots.change_state);
        drop(slots);
        match f(&target) {
          Ok(()) => Ok(true),
          // Nothing was switched, so the step may still report another way.
          Err(err @ SequencerError::UnknownName { .. }) => {
            self.unlock();
            event!(Level::DEBUG, step_id = %self.inner.step.id(), %target, "State change target unknown, handler reopened.");
            Err(err)
          }
          Err(err) => Err(err),
        }
      }
    }
  }

  /// Locks the handler if it is open. Returns `false` if it already was locked.
  pub(crate) fn try_lock(&self) -> bool {
    let mut slots = self.inner.slots.lock();
    if slots.locked {
      return false;
    }
    slots.locked = true;
    true
  }

  pub fn advance(&self, data: T) -> bool {
    matches!(self.signal(Signal::Advance(data)), Ok(true))
  }

  pub fn fail(&self, data: T) -> bool {
    matches!(self.signal(Signal::Fail(data)), Ok(true))
  }

  /// Asks the owning registry to switch to the chain named `target`.
  pub fn change_state(&self, target: impl Into<String>) -> SequencerResult<bool> {
    self.signal(Signal::ChangeState(target.into()))
  }
}
