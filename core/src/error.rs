// seqflow/src/error.rs
use crate::core::id::StepId;
use thiserror::Error;

/// Broad category of a [`SequencerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  /// Missing or invalid construction input (options, step kind, chain name).
  Configuration,
  /// The operation is not valid for the current state of a chain or registry.
  State,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencerError {
  #[error("Configuration error: step options without a kind (chain '{chain}')")]
  MissingOptions { chain: String },

  #[error("Configuration error: invalid step kind '{value}' (accepted: {accepted})")]
  InvalidStepKind { value: String, accepted: &'static str },

  #[error("Configuration error: invalid chain name '{name}'")]
  InvalidName { name: String },

  #[error("Configuration error: chain '{name}' is already registered")]
  NameExists { name: String },

  #[error("Step {step_id} does not belong to chain '{chain}'")]
  StepNotInChain { chain: String, step_id: StepId },

  #[error("Chain '{chain}' is not finalized ({steps} steps defined)")]
  NotReady { chain: String, steps: usize },

  #[error("Chain '{chain}' has no steps to run")]
  EmptyChain { chain: String },

  #[error("No chain registered under '{name}'")]
  UnknownName { name: String },
}

impl SequencerError {
  pub fn class(&self) -> ErrorClass {
    match self {
      SequencerError::MissingOptions { .. }
      | SequencerError::InvalidStepKind { .. }
      | SequencerError::InvalidName { .. }
      | SequencerError::NameExists { .. }
      | SequencerError::StepNotInChain { .. } => ErrorClass::Configuration,
      SequencerError::NotReady { .. }
      | SequencerError::EmptyChain { .. }
      | SequencerError::UnknownName { .. } => ErrorClass::State,
    }
  }
}

pub type SequencerResult<T, E = SequencerError> = std::result::Result<T, E>;
