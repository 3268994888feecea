// seqflow/src/chain/definition.rs

//! Contains the `Chain<T>` struct definition and its builder methods.

use crate::core::handler::{Handler, StateFn};
use crate::core::id::{StepId, StepIdGen};
use crate::core::step::{ExecFn, Step, StepKind, StepOptions};
use crate::error::SequencerResult;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{event, Level};

pub(crate) struct ChainBody<T> {
  pub(crate) steps: Vec<Arc<Step<T>>>,
  pub(crate) ready: bool,
}

pub(crate) struct ChainInner<T> {
  pub(crate) name: String,
  pub(crate) ids: StepIdGen,
  pub(crate) state_callback: Option<StateFn>,
  pub(crate) body: Mutex<ChainBody<T>>,
}

/// An ordered, named sequence of steps.
///
/// `Chain` is a cheap clone handle; a registry and its callers share the same
/// chain. Builder methods take `&self` and return `&Self` so they can be
/// chained straight off `Registry::register`:
///
/// ```ignore
/// registry.register("main")?
///   .process(|_, h| { h.advance(1); })
///   .process(|data, h| { h.advance(data.unwrap_or(0) + 1); })
///   .finalize()
///   .run()?;
/// ```
pub struct Chain<T> {
  pub(crate) inner: Arc<ChainInner<T>>,
}

impl<T> Clone for Chain<T> {
  fn clone(&self) -> Self {
    Chain {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T> fmt::Debug for Chain<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let body = self.inner.body.lock();
    f.debug_struct("Chain")
      .field("name", &self.inner.name)
      .field("steps", &body.steps.len())
      .field("ready", &body.ready)
      .finish()
  }
}

impl<T: Clone + Send + Sync + 'static> Chain<T> {
  /// Creates a standalone chain with its own id sequence and no state callback.
  /// `Handler::change_state` on its steps only records the status change.
  pub fn new(name: impl Into<String>) -> Self {
    Self::with_parts(name.into(), StepIdGen::new(), None)
  }

  pub(crate) fn with_parts(name: String, ids: StepIdGen, state_callback: Option<StateFn>) -> Self {
    Chain {
      inner: Arc::new(ChainInner {
        name,
        ids,
        state_callback,
        body: Mutex::new(ChainBody {
          steps: Vec::new(),
          ready: false,
        }),
      }),
    }
  }

  fn append(&self, step: Arc<Step<T>>) -> &Self {
    let mut body = self.inner.body.lock();
    if body.ready {
      event!(Level::WARN, chain = %self.inner.name, step_id = %step.id(), "Step appended to a finalized chain; finalize must run again.");
      body.ready = false;
    }
    body.steps.push(step);
    self
  }

  fn append_kind(&self, kind: StepKind, exec: ExecFn<T>) -> &Self {
    let step = Step::build(
      kind,
      Some(exec),
      self.inner.state_callback.clone(),
      &self.inner.name,
      &self.inner.ids,
    );
    self.append(step)
  }

  /// Appends a step built from explicit options. This is the only way to add
  /// BEFORE/AFTER steps, which are kept in order but never wired.
  pub fn push(&self, options: StepOptions<T>) -> SequencerResult<&Self> {
    let options = options.with_state_callback_fallback(self.inner.state_callback.clone());
    let step = Step::new(options, &self.inner.name, &self.inner.ids)?;
    Ok(self.append(step))
  }

  /// Appends a PROCESS step.
  pub fn process(&self, f: impl Fn(Option<T>, Handler<T>) + Send + Sync + 'static) -> &Self {
    self.append_kind(StepKind::Process, Arc::new(f))
  }

  /// Alias of [`Chain::process`].
  #[doc(alias = "do")]
  pub fn then(&self, f: impl Fn(Option<T>, Handler<T>) + Send + Sync + 'static) -> &Self {
    self.process(f)
  }

  /// Appends an ERROR_HANDLER step.
  pub fn error(&self, f: impl Fn(Option<T>, Handler<T>) + Send + Sync + 'static) -> &Self {
    self.append_kind(StepKind::ErrorHandler, Arc::new(f))
  }

  /// Appends a STATE step. Its handler's `change_state` reaches the owning
  /// registry's `transition`.
  pub fn state(&self, f: impl Fn(Option<T>, Handler<T>) + Send + Sync + 'static) -> &Self {
    self.append_kind(StepKind::State, Arc::new(f))
  }

  /// Appends a PROCESS step bound to an explicit context.
  pub fn process_in<C>(&self, ctx: C, f: impl Fn(&C, Option<T>, Handler<T>) + Send + Sync + 'static) -> &Self
  where
    C: Send + Sync + 'static,
  {
    self.append_kind(StepKind::Process, bind(ctx, f))
  }

  pub fn error_in<C>(&self, ctx: C, f: impl Fn(&C, Option<T>, Handler<T>) + Send + Sync + 'static) -> &Self
  where
    C: Send + Sync + 'static,
  {
    self.append_kind(StepKind::ErrorHandler, bind(ctx, f))
  }

  pub fn state_in<C>(&self, ctx: C, f: impl Fn(&C, Option<T>, Handler<T>) + Send + Sync + 'static) -> &Self
  where
    C: Send + Sync + 'static,
  {
    self.append_kind(StepKind::State, bind(ctx, f))
  }
}

fn bind<T, C>(ctx: C, f: impl Fn(&C, Option<T>, Handler<T>) + Send + Sync + 'static) -> ExecFn<T>
where
  T: 'static,
  C: Send + Sync + 'static,
{
  Arc::new(move |data: Option<T>, handler: Handler<T>| f(&ctx, data, handler))
}

impl<T> Chain<T> {
  pub fn name(&self) -> &str {
    &self.inner.name
  }

  pub fn len(&self) -> usize {
    self.inner.body.lock().steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.body.lock().steps.is_empty()
  }

  /// True once `finalize` has run and no step was appended since.
  pub fn is_ready(&self) -> bool {
    self.inner.body.lock().ready
  }

  /// The steps in insertion order.
  pub fn steps(&self) -> Vec<Arc<Step<T>>> {
    self.inner.body.lock().steps.clone()
  }

  pub fn step(&self, id: StepId) -> Option<Arc<Step<T>>> {
    self.inner.body.lock().steps.iter().find(|s| s.id() == id).cloned()
  }

  /// True when both handles refer to the same chain.
  pub fn same_as(&self, other: &Chain<T>) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }
}
