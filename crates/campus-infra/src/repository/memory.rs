//! In-memory document collections, used when no document store is wired in.
//! Data is lost on process restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use campus_core::domain::{Comment, Listing, User};
use campus_core::error::RepoError;
use campus_core::ports::{BaseRepository, CommentRepository, ListingRepository, UserRepository};

/// One collection of documents keyed by id.
struct Collection<T> {
    docs: RwLock<HashMap<Uuid, T>>,
}

impl<T: Clone> Collection<T> {
    fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }

    async fn get(&self, id: Uuid) -> Option<T> {
        self.docs.read().await.get(&id).cloned()
    }

    async fn put(&self, id: Uuid, doc: T) -> T {
        self.docs.write().await.insert(id, doc.clone());
        doc
    }

    async fn remove(&self, id: Uuid) -> Result<(), RepoError> {
        self.docs
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.docs
            .read()
            .await
            .values()
            .filter(|doc| pred(*doc))
            .cloned()
            .collect()
    }
}

pub struct InMemoryUserRepository {
    users: Collection<User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Collection::new(),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.users.get(id).await)
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        let email = user.email.to_lowercase();
        let taken = self
            .users
            .filter(|u| u.id != user.id && u.email.to_lowercase() == email)
            .await;
        if !taken.is_empty() {
            return Err(RepoError::Constraint(format!(
                "email {} already registered",
                user.email
            )));
        }

        Ok(self.users.put(user.id, user).await)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.users.remove(id).await
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .filter(|u| u.email.to_lowercase() == email)
            .await
            .into_iter()
            .next())
    }
}

pub struct InMemoryCommentRepository {
    comments: Collection<Comment>,
}

impl InMemoryCommentRepository {
    pub fn new() -> Self {
        Self {
            comments: Collection::new(),
        }
    }
}

impl Default for InMemoryCommentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.comments.get(id).await)
    }

    async fn save(&self, comment: Comment) -> Result<Comment, RepoError> {
        Ok(self.comments.put(comment.id, comment).await)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.comments.remove(id).await
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let mut comments = self.comments.filter(|c| c.post_id == post_id).await;
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }
}

pub struct InMemoryListingRepository {
    listings: Collection<Listing>,
}

impl InMemoryListingRepository {
    pub fn new() -> Self {
        Self {
            listings: Collection::new(),
        }
    }
}

impl Default for InMemoryListingRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<Listing, Uuid> for InMemoryListingRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>, RepoError> {
        Ok(self.listings.get(id).await)
    }

    async fn save(&self, listing: Listing) -> Result<Listing, RepoError> {
        Ok(self.listings.put(listing.id, listing).await)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.listings.remove(id).await
    }
}

#[async_trait]
impl ListingRepository for InMemoryListingRepository {
    async fn find_by_seller(&self, seller_id: Uuid) -> Result<Vec<Listing>, RepoError> {
        Ok(self.listings.filter(|l| l.seller_id == seller_id).await)
    }
}
