// seqflow/src/chain/execution.rs

//! Contains the `Chain::run()` method and the handler lock helpers used by
//! runs and registry transitions.

use crate::chain::definition::Chain;
use crate::core::step::{Step, StepSnapshot};
use crate::error::{SequencerError, SequencerResult};
use std::sync::Arc;
use tracing::{event, instrument, Level};

impl<T: Clone + Send + Sync + 'static> Chain<T> {
  /// Starts the chain from its first step with no data.
  ///
  /// Every step is reset to `Initial` and every handler unlocked first, so a
  /// chain can be run again (or restarted mid-flight) any number of times.
  /// Returns once the first step's function returns; steps that signal later
  /// continue the chain from wherever they signal.
  #[instrument(
    name = "Chain::run",
    skip_all,
    fields(chain = %self.inner.name),
    err(Display)
  )]
  pub fn run(&self) -> SequencerResult<()> {
    let first = self.prepare_run()?;
    self.start(first);
    Ok(())
  }

  /// Checks the chain can run, then resets every step and unlocks every
  /// handler. Returns the first step, not yet started.
  pub(crate) fn prepare_run(&self) -> SequencerResult<Arc<Step<T>>> {
    let body = self.inner.body.lock();
    if !body.ready {
      return Err(SequencerError::NotReady {
        chain: self.inner.name.clone(),
        steps: body.steps.len(),
      });
    }
    let first = body.steps.first().cloned().ok_or_else(|| SequencerError::EmptyChain {
      chain: self.inner.name.clone(),
    })?;
    for step in &body.steps {
      step.reset();
      step.handler().unlock();
    }
    Ok(first)
  }

  pub(crate) fn start(&self, first: Arc<Step<T>>) {
    event!(Level::DEBUG, chain = %self.inner.name, first_step = %first.id(), "Chain execution starting.");
    first.run(None);
  }

  /// Per-step log of kind, status and last data, in insertion order.
  pub fn snapshot(&self) -> Vec<StepSnapshot<T>> {
    self.steps().iter().map(|s| s.snapshot()).collect()
  }
}

impl<T> Chain<T> {
  /// Locks every step handler; late signals from this chain become no-ops.
  pub fn lock_all(&self) {
    for step in &self.inner.body.lock().steps {
      step.handler().lock();
    }
  }

  pub fn unlock_all(&self) {
    for step in &self.inner.body.lock().steps {
      step.handler().unlock();
    }
  }
}
