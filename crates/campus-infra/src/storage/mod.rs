//! Object storage implementations.

mod memory;

pub use memory::InMemoryObjectStorage;
