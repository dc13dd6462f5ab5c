//! # Campus Core
//!
//! The domain layer of the campus backend.
//! Rate-limit policies, identity keys and decisions live here together with
//! the ports that infrastructure implements. No I/O in this crate.

pub mod domain;
pub mod error;
pub mod ports;

pub use domain::{Decision, IdentityKey, RateLimitPolicies, RateLimitPolicy};
pub use error::DomainError;
