//! Domain-level error types.

use thiserror::Error;
use uuid::Uuid;

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: Uuid },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Document store errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Document store unavailable: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Document not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Raised when a rate-limit policy is built with a non-positive bound.
///
/// Only ever produced at startup, never while serving a request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("policy `{0}` has a zero-length window")]
    ZeroWindow(String),

    #[error("policy `{0}` allows zero requests per window")]
    ZeroMaxRequests(String),
}
