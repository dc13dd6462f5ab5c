//! Document store implementations.

mod memory;

pub use memory::{InMemoryCommentRepository, InMemoryListingRepository, InMemoryUserRepository};
