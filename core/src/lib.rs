// seqflow/src/lib.rs

//! Seqflow: declarative step chains in place of nested completion callbacks.
//!
//! A chain is an ordered list of steps built with a fluent API:
//!  - PROCESS steps do the work and report through a one-shot `Handler`.
//!  - ERROR_HANDLER steps receive whatever a preceding PROCESS step `fail`s with.
//!  - STATE steps (or any step) can ask the owning registry to switch chains.
//!
//! `Chain::finalize` links each PROCESS step to the nearest following PROCESS
//! and ERROR_HANDLER step. `Chain::run` starts the first step; from then on the
//! chain is driven entirely by handler signals, which may arrive synchronously
//! or later from another thread or task. A handler accepts one signal per run.
//!
//! A `Registry` keeps named chains and switches between them with
//! `Registry::transition`, locking every handler of every chain first so stale
//! steps of the chain being left cannot continue.

pub mod chain;
pub mod core;
pub mod error;
pub mod registry;

// --- Re-exports for the Public API ---

pub use crate::core::handler::{Callback, Handler, PayloadFn, StateFn};
pub use crate::core::id::{StepId, StepIdGen};
pub use crate::core::signal::{Signal, Slot};
pub use crate::core::step::{ExecFn, Step, StepInfo, StepKind, StepOptions, StepSnapshot, StepStatus};

pub use crate::chain::definition::Chain;

pub use crate::error::{ErrorClass, SequencerError, SequencerResult};

pub use crate::registry::Registry;

/*
    Typical use:
    1. Create a `Registry<MyData>`.
    2. `registry.register("name")?` for each chain, then add steps with
       `.process(..)`, `.error(..)`, `.state(..)`.
    3. Call `.finalize()` on every chain.
    4. `registry.transition("name")?` to start one. Steps call
       `handler.advance(data)`, `handler.fail(data)` or
       `handler.change_state("other")` when they are done.
*/
