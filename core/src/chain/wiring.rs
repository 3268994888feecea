// seqflow/src/chain/wiring.rs

//! Contains `Chain::finalize()`, which resolves the forward links between steps,
//! and the nearest-forward lookup it is built on.

use crate::chain::definition::Chain;
use crate::core::id::StepId;
use crate::core::step::{Step, StepKind};
use crate::error::{SequencerError, SequencerResult};
use std::sync::Arc;
use tracing::{event, instrument, Level};

impl<T: Clone + Send + Sync + 'static> Chain<T> {
  /// Wires every PROCESS step to the nearest following PROCESS step (advance
  /// path) and the nearest following ERROR_HANDLER step (fail path), then marks
  /// the chain ready.
  ///
  /// Links only ever point forward. A step with nothing suitable after it is
  /// left unlinked and reported at DEBUG level. Calling `finalize` again on an
  /// unchanged chain does nothing.
  #[instrument(
    name = "Chain::finalize",
    skip_all,
    fields(chain = %self.inner.name)
  )]
  pub fn finalize(&self) -> &Self {
    let mut body = self.inner.body.lock();
    if body.ready {
      event!(Level::DEBUG, "Chain already finalized.");
      return self;
    }

    // Walking backwards, the last PROCESS / ERROR_HANDLER seen is the nearest
    // forward match for the current step.
    let mut nearest_process: Option<Arc<Step<T>>> = None;
    let mut nearest_error_handler: Option<Arc<Step<T>>> = None;
    let mut links = 0usize;

    for step in body.steps.iter().rev() {
      step.unlink();

      if step.kind() == StepKind::Process {
        match &nearest_process {
          Some(target) if step.link_to_next(target) => links += 1,
          _ => event!(Level::DEBUG, step_id = %step.id(), "No following process step."),
        }
        match &nearest_error_handler {
          Some(target) if step.link_to_error_handler(target) => links += 1,
          _ => event!(Level::DEBUG, step_id = %step.id(), "No following error handler."),
        }
      }

      match step.kind() {
        StepKind::Process => nearest_process = Some(Arc::clone(step)),
        StepKind::ErrorHandler => nearest_error_handler = Some(Arc::clone(step)),
        _ => {}
      }
    }

    body.ready = true;
    event!(Level::DEBUG, steps = body.steps.len(), links, "Chain finalized.");
    self
  }

  /// Returns the first step of `kind` strictly after the step `base`, or
  /// `None` when the end of the chain is reached first.
  pub fn closest_step(&self, base: StepId, kind: StepKind) -> SequencerResult<Option<Arc<Step<T>>>> {
    let body = self.inner.body.lock();
    let index = body
      .steps
      .iter()
      .position(|s| s.id() == base)
      .ok_or_else(|| SequencerError::StepNotInChain {
        chain: self.inner.name.clone(),
        step_id: base,
      })?;

    Ok(body.steps[index + 1..].iter().find(|s| s.kind() == kind).cloned())
  }

  pub fn closest_process(&self, base: StepId) -> SequencerResult<Option<Arc<Step<T>>>> {
    self.closest_step(base, StepKind::Process)
  }

  pub fn closest_error_handler(&self, base: StepId) -> SequencerResult<Option<Arc<Step<T>>>> {
    self.closest_step(base, StepKind::ErrorHandler)
  }
}
