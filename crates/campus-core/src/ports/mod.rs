//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod rate_limit;
mod repository;
mod storage;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService};
pub use rate_limit::{RateLimitError, RateLimiter, WindowCount, WindowStore};
pub use repository::{BaseRepository, CommentRepository, ListingRepository, UserRepository};
pub use storage::{ObjectStorage, StorageError, StoredObject, UploadMetadata};
