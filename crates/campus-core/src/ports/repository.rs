use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Comment, Listing, User};
use crate::error::RepoError;

/// Document store access shared by every collection.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find a document by its ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert or replace a document.
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
}

#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// Comments on a post, oldest first.
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError>;
}

#[async_trait]
pub trait ListingRepository: BaseRepository<Listing, Uuid> {
    async fn find_by_seller(&self, seller_id: Uuid) -> Result<Vec<Listing>, RepoError>;
}
