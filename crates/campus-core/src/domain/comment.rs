use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A comment left by a user on a feed post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post_id: Uuid, author_id: Uuid, body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            body,
            created_at: Utc::now(),
        }
    }
}
