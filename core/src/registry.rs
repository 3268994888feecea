// seqflow/src/registry.rs

//! Defines `Registry<T>`, a name-keyed collection of chains with at most one
//! active chain at a time.
//!
//! Chains created through `Registry::register` receive a state callback bound
//! to `Registry::transition`, so any step can switch the active chain by
//! calling `Handler::change_state(name)`. A transition locks every handler of
//! every registered chain before starting the target, which neutralizes any
//! step still waiting to signal in the chain being left.

use crate::chain::definition::Chain;
use crate::core::handler::StateFn;
use crate::core::id::StepIdGen;
use crate::error::{SequencerError, SequencerResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{event, instrument, Level};

struct RegistryState<T> {
  chains: HashMap<String, Chain<T>>,
  active: Option<String>,
}

struct RegistryInner<T> {
  ids: StepIdGen,
  state: Mutex<RegistryState<T>>,
}

/// Cheap clone handle to a registry of named chains.
pub struct Registry<T> {
  inner: Arc<RegistryInner<T>>,
}

impl<T> Clone for Registry<T> {
  fn clone(&self) -> Self {
    Registry {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T> fmt::Debug for Registry<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.inner.state.lock();
    let mut names: Vec<&String> = state.chains.keys().collect();
    names.sort();
    f.debug_struct("Registry")
      .field("chains", &names)
      .field("active", &state.active)
      .finish()
  }
}

impl<T: Clone + Send + Sync + 'static> Default for Registry<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Clone + Send + Sync + 'static> Registry<T> {
  /// Creates an empty registry with its own step id sequence.
  pub fn new() -> Self {
    Self::with_id_gen(StepIdGen::new())
  }

  /// Creates an empty registry whose chains draw step ids from `ids`.
  pub fn with_id_gen(ids: StepIdGen) -> Self {
    Registry {
      inner: Arc::new(RegistryInner {
        ids,
        state: Mutex::new(RegistryState {
          chains: HashMap::new(),
          active: None,
        }),
      }),
    }
  }

  /// Creates, stores and returns a new chain named `name`.
  #[instrument(name = "Registry::register", skip(self), err(Display))]
  pub fn register(&self, name: &str) -> SequencerResult<Chain<T>> {
    if name.is_empty() {
      return Err(SequencerError::InvalidName { name: name.to_string() });
    }

    let mut state = self.inner.state.lock();
    if state.chains.contains_key(name) {
      return Err(SequencerError::NameExists { name: name.to_string() });
    }

    let chain = Chain::with_parts(
      name.to_string(),
      self.inner.ids.clone(),
      Some(transition_callback(Arc::downgrade(&self.inner))),
    );
    state.chains.insert(name.to_string(), chain.clone());
    event!(Level::DEBUG, chains = state.chains.len(), "Chain registered.");
    Ok(chain)
  }

  /// Makes `name` the active chain and runs it from its first step.
  ///
  /// Every handler of every registered chain is locked first. Transitioning to
  /// the chain that is already active restarts it. The active chain is updated
  /// even if the target then fails to run (not finalized, or empty).
  #[instrument(name = "Registry::transition", skip(self), err(Display))]
  pub fn transition(&self, name: &str) -> SequencerResult<()> {
    let (target, first) = {
      let mut state = self.inner.state.lock();
      let target = state.chains.get(name).cloned().ok_or_else(|| {
        event!(Level::ERROR, "No chain registered under this name.");
        SequencerError::UnknownName { name: name.to_string() }
      })?;

      for chain in state.chains.values() {
        chain.lock_all();
      }
      let previous = state.active.replace(name.to_string());
      event!(Level::INFO, previous = ?previous, "Switching active chain.");

      // Reopened while the registry is still held, so a concurrent transition
      // either locks it again afterwards or ran entirely before it.
      let first = target.prepare_run()?;
      (target, first)
    };

    target.start(first);
    Ok(())
  }
}

impl<T> Registry<T> {
  pub fn chain(&self, name: &str) -> Option<Chain<T>> {
    self.inner.state.lock().chains.get(name).cloned()
  }

  /// Name of the active chain, `None` before the first transition.
  pub fn active(&self) -> Option<String> {
    self.inner.state.lock().active.clone()
  }

  pub fn active_chain(&self) -> Option<Chain<T>> {
    let state = self.inner.state.lock();
    state.active.as_ref().and_then(|name| state.chains.get(name).cloned())
  }

  /// Registered chain names, sorted.
  pub fn names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.inner.state.lock().chains.keys().cloned().collect();
    names.sort();
    names
  }

  pub fn contains(&self, name: &str) -> bool {
    self.inner.state.lock().chains.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.inner.state.lock().chains.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.state.lock().chains.is_empty()
  }
}

// Holds the registry weakly: chains live inside the registry, so a strong
// reference here would keep it alive forever.
fn transition_callback<T: Clone + Send + Sync + 'static>(registry: Weak<RegistryInner<T>>) -> StateFn {
  Arc::new(move |target: &str| match registry.upgrade() {
    Some(inner) => Registry { inner }.transition(target),
    None => {
      event!(Level::WARN, %target, "State change requested after the registry was dropped.");
      Err(SequencerError::UnknownName {
        name: target.to_string(),
      })
    }
  })
}
