pub mod handler;
pub mod id;
pub mod signal;
pub mod step;

// Re-export key types for easier access from other modules (and lib.rs)
pub use handler::{Callback, Handler};
pub use id::{StepId, StepIdGen};
pub use signal::{Signal, Slot};
pub use step::{Step, StepInfo, StepKind, StepOptions, StepStatus};
