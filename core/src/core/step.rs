// seqflow/src/core/step.rs

//! Defines a single step of a chain: its kind, status, execution function,
//! forward links and the `Handler` it reports completion through.

use crate::core::handler::{Handler, PayloadFn, StateFn};
use crate::core::id::{StepId, StepIdGen};
use crate::error::{SequencerError, SequencerResult};
use parking_lot::Mutex;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};
use tracing::{event, Level};

/// Execution function of a step. It receives the data produced by the step
/// that linked into it (`None` for the first step of a run) and a clone of the
/// step's handler, and must eventually signal that handler exactly once.
pub type ExecFn<T> = Arc<dyn Fn(Option<T>, Handler<T>) + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
  Process,
  ErrorHandler,
  /// Stored but never wired by `Chain::finalize`.
  Before,
  /// Stored but never wired by `Chain::finalize`.
  After,
  State,
}

const KIND_NAMES: &str = "process, do, error_handler, error, before, after, state";
const KIND_CODES: &str = "1 through 5";

impl StepKind {
  /// Numeric step-type code, 1 (PROCESS) through 5 (STATE).
  /// `StepKind::try_from(code)` maps it back.
  pub fn code(&self) -> u8 {
    match self {
      StepKind::Process => 1,
      StepKind::ErrorHandler => 2,
      StepKind::Before => 3,
      StepKind::After => 4,
      StepKind::State => 5,
    }
  }
}

impl fmt::Display for StepKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      StepKind::Process => "process",
      StepKind::ErrorHandler => "error_handler",
      StepKind::Before => "before",
      StepKind::After => "after",
      StepKind::State => "state",
    };
    f.write_str(s)
  }
}

impl FromStr for StepKind {
  type Err = SequencerError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "process" | "do" => Ok(StepKind::Process),
      "error_handler" | "error" => Ok(StepKind::ErrorHandler),
      "before" => Ok(StepKind::Before),
      "after" => Ok(StepKind::After),
      "state" => Ok(StepKind::State),
      _ => Err(SequencerError::InvalidStepKind {
        value: s.to_string(),
        accepted: KIND_NAMES,
      }),
    }
  }
}

impl TryFrom<u8> for StepKind {
  type Error = SequencerError;

  fn try_from(code: u8) -> Result<Self, Self::Error> {
    match code {
      1 => Ok(StepKind::Process),
      2 => Ok(StepKind::ErrorHandler),
      3 => Ok(StepKind::Before),
      4 => Ok(StepKind::After),
      5 => Ok(StepKind::State),
      other => Err(SequencerError::InvalidStepKind {
        value: other.to_string(),
        accepted: KIND_CODES,
      }),
    }
  }
}

/// Per-activation lifecycle of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepStatus {
  #[default]
  Initial,
  InProcess,
  Done,
  Error,
  StateChanged,
}

/// Identity of a step: what a step function sees as its default context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepInfo {
  id: StepId,
  kind: StepKind,
  chain: String,
}

impl StepInfo {
  pub fn new(id: StepId, kind: StepKind, chain: impl Into<String>) -> Self {
    StepInfo {
      id,
      kind,
      chain: chain.into(),
    }
  }

  pub fn id(&self) -> StepId {
    self.id
  }

  pub fn kind(&self) -> StepKind {
    self.kind
  }

  pub fn chain(&self) -> &str {
    &self.chain
  }
}

/// Construction options for a [`Step`].
///
/// `StepOptions::default()` carries no kind and is rejected by `Step::new`.
pub struct StepOptions<T> {
  kind: Option<StepKind>,
  exec: Option<ExecFn<T>>,
  state_callback: Option<StateFn>,
}

impl<T> Default for StepOptions<T> {
  fn default() -> Self {
    StepOptions {
      kind: None,
      exec: None,
      state_callback: None,
    }
  }
}

impl<T: 'static> StepOptions<T> {
  pub fn new(kind: StepKind) -> Self {
    StepOptions {
      kind: Some(kind),
      ..Default::default()
    }
  }

  pub fn kind(mut self, kind: StepKind) -> Self {
    self.kind = Some(kind);
    self
  }

  /// Sets an execution function that uses the step itself as context
  /// (reachable through `Handler::step`).
  pub fn exec(mut self, f: impl Fn(Option<T>, Handler<T>) + Send + Sync + 'static) -> Self {
    self.exec = Some(Arc::new(f));
    self
  }

  /// Sets an execution function bound to an explicit context value.
  pub fn exec_in<C>(mut self, ctx: C, f: impl Fn(&C, Option<T>, Handler<T>) + Send + Sync + 'static) -> Self
  where
    C: Send + Sync + 'static,
  {
    self.exec = Some(Arc::new(move |data: Option<T>, handler: Handler<T>| f(&ctx, data, handler)));
    self
  }

  /// Continuation for `Handler::change_state`. Chains fill this in with their
  /// registry's transition unless it is set here.
  pub fn state_callback(mut self, f: impl Fn(&str) -> SequencerResult<()> + Send + Sync + 'static) -> Self {
    self.state_callback = Some(Arc::new(f));
    self
  }

  pub(crate) fn with_state_callback_fallback(mut self, fallback: Option<StateFn>) -> Self {
    if self.state_callback.is_none() {
      self.state_callback = fallback;
    }
    self
  }
}

struct StepState<T> {
  status: StepStatus,
  last_data: Option<T>,
  next: Option<Arc<Step<T>>>,
  error_handler: Option<Arc<Step<T>>>,
}

/// Point-in-time view of a step, used for chain logs.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSnapshot<T> {
  pub id: StepId,
  pub kind: StepKind,
  pub status: StepStatus,
  pub last_data: Option<T>,
}

pub struct Step<T> {
  info: StepInfo,
  exec: Option<ExecFn<T>>,
  handler: Handler<T>,
  state: Mutex<StepState<T>>,
}

impl<T> fmt::Debug for Step<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state.lock();
    f.debug_struct("Step")
      .field("info", &self.info)
      .field("status", &state.status)
      .field("has_exec", &self.exec.is_some())
      .field("next", &state.next.as_ref().map(|s| s.id()))
      .field("error_handler", &state.error_handler.as_ref().map(|s| s.id()))
      .finish()
  }
}

impl<T: Clone + Send + Sync + 'static> Step<T> {
  /// Builds a step from options. Fails with `MissingOptions` when no kind is set.
  pub fn new(options: StepOptions<T>, chain: &str, ids: &StepIdGen) -> SequencerResult<Arc<Self>> {
    let kind = options.kind.ok_or_else(|| SequencerError::MissingOptions {
      chain: chain.to_string(),
    })?;
    Ok(Self::build(kind, options.exec, options.state_callback, chain, ids))
  }

  pub(crate) fn build(
    kind: StepKind,
    exec: Option<ExecFn<T>>,
    state_callback: Option<StateFn>,
    chain: &str,
    ids: &StepIdGen,
  ) -> Arc<Self> {
    let info = StepInfo::new(ids.next_id(), kind, chain);

    Arc::new_cyclic(|weak: &Weak<Step<T>>| {
      let on_advance: PayloadFn<T> = {
        let weak = weak.clone();
        Arc::new(move |data: T| {
          if let Some(step) = weak.upgrade() {
            step.on_advance(data);
          }
        })
      };
      let on_fail: PayloadFn<T> = {
        let weak = weak.clone();
        Arc::new(move |data: T| {
          if let Some(step) = weak.upgrade() {
            step.on_fail(data);
          }
        })
      };
      let on_state: StateFn = {
        let weak = weak.clone();
        Arc::new(move |target: &str| {
          // Marked before the callback: a successful transition may restart
          // this very step, and its fresh status must not be overwritten.
          let step = weak.upgrade();
          let previous = step.as_ref().map(|s| s.replace_status(StepStatus::StateChanged));
          if let Some(step) = &step {
            event!(Level::DEBUG, step_id = %step.id(), chain = %step.info.chain, %target, "Step requested a state change.");
          }

          let result = match &state_callback {
            Some(cb) => cb(target),
            None => Ok(()),
          };
          if let (Err(SequencerError::UnknownName { .. }), Some(step), Some(previous)) = (&result, &step, previous) {
            step.set_status(previous);
          }
          result
        })
      };

      Step {
        handler: Handler::with_slots(info.clone(), on_advance, on_fail, on_state),
        info,
        exec,
        state: Mutex::new(StepState {
          status: StepStatus::Initial,
          last_data: None,
          next: None,
          error_handler: None,
        }),
      }
    })
  }

  /// Runs the execution function with `data` and a clone of this step's handler.
  ///
  /// A step built without an execution function advances immediately: with
  /// data it signals advance through its handler, without data it locks its
  /// handler itself and starts the next PROCESS step with no data.
  pub fn run(&self, data: Option<T>) {
    self.set_status(StepStatus::InProcess);
    event!(Level::TRACE, step_id = %self.id(), kind = %self.kind(), "Running step.");

    match &self.exec {
      Some(f) => f(data, self.handler.clone()),
      None => match data {
        Some(data) => {
          self.handler.advance(data);
        }
        None => self.advance_empty(),
      },
    }
  }

  fn advance_empty(&self) {
    if !self.handler.try_lock() {
      return;
    }
    let next = {
      let mut state = self.state.lock();
      state.status = StepStatus::Done;
      state.next.clone()
    };
    match next {
      Some(next) => next.run(None),
      None => event!(Level::DEBUG, step_id = %self.id(), chain = %self.info.chain, "Step advanced with no following process step."),
    }
  }

  fn on_advance(&self, data: T) {
    let next = {
      let mut state = self.state.lock();
      state.status = StepStatus::Done;
      state.last_data = Some(data.clone());
      state.next.clone()
    };
    match next {
      Some(next) => next.run(Some(data)),
      None => event!(Level::DEBUG, step_id = %self.id(), chain = %self.info.chain, "Step advanced with no following process step."),
    }
  }

  fn on_fail(&self, data: T) {
    let error_handler = {
      let mut state = self.state.lock();
      state.status = StepStatus::Error;
      state.last_data = Some(data.clone());
      state.error_handler.clone()
    };
    match error_handler {
      Some(target) => target.run(Some(data)),
      None => event!(Level::WARN, step_id = %self.id(), chain = %self.info.chain, "Step failed with no error handler to receive it."),
    }
  }

  pub fn snapshot(&self) -> StepSnapshot<T> {
    let state = self.state.lock();
    StepSnapshot {
      id: self.id(),
      kind: self.kind(),
      status: state.status,
      last_data: state.last_data.clone(),
    }
  }

  pub fn last_data(&self) -> Option<T> {
    self.state.lock().last_data.clone()
  }
}

impl<T> Step<T> {
  pub fn id(&self) -> StepId {
    self.info.id()
  }

  pub fn kind(&self) -> StepKind {
    self.info.kind()
  }

  pub fn info(&self) -> &StepInfo {
    &self.info
  }

  pub fn handler(&self) -> &Handler<T> {
    &self.handler
  }

  pub fn has_exec(&self) -> bool {
    self.exec.is_some()
  }

  pub fn status(&self) -> StepStatus {
    self.state.lock().status
  }

  fn set_status(&self, status: StepStatus) {
    self.state.lock().status = status;
  }

  fn replace_status(&self, status: StepStatus) -> StepStatus {
    std::mem::replace(&mut self.state.lock().status, status)
  }

  /// Links this step's advance path to `target`.
  /// Only PROCESS → PROCESS is accepted; anything else returns `false`.
  pub fn link_to_next(&self, target: &Arc<Step<T>>) -> bool {
    if self.kind() != StepKind::Process || target.kind() != StepKind::Process {
      return false;
    }
    self.state.lock().next = Some(Arc::clone(target));
    true
  }

  /// Links this step's fail path to `target`.
  /// Only PROCESS → ERROR_HANDLER is accepted; anything else returns `false`.
  pub fn link_to_error_handler(&self, target: &Arc<Step<T>>) -> bool {
    if self.kind() != StepKind::Process || target.kind() != StepKind::ErrorHandler {
      return false;
    }
    self.state.lock().error_handler = Some(Arc::clone(target));
    true
  }

  pub fn next_step_id(&self) -> Option<StepId> {
    self.state.lock().next.as_ref().map(|s| s.id())
  }

  pub fn error_handler_id(&self) -> Option<StepId> {
    self.state.lock().error_handler.as_ref().map(|s| s.id())
  }

  pub(crate) fn unlink(&self) {
    let mut state = self.state.lock();
    state.next = None;
    state.error_handler = None;
  }

  pub(crate) fn reset(&self) {
    let mut state = self.state.lock();
    state.status = StepStatus::Initial;
    state.last_data = None;
  }
}
