// seqflow/src/chain/mod.rs

//! Defines the `Chain<T>` struct, its construction, link wiring and execution.

pub mod definition;
pub mod execution;
pub mod wiring;

pub use definition::Chain;
