//! Domain entities - the core business objects.

mod comment;
mod listing;
mod rate_limit;
mod user;

pub use comment::Comment;
pub use listing::Listing;
pub use rate_limit::{Decision, IdentityKey, RateLimitPolicies, RateLimitPolicy};
pub use user::User;
