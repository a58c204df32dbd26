//! Bundled object store providers

mod local;
mod memory;

pub use local::LocalStore;
pub use memory::{Fault, MemoryStore, Operation};
