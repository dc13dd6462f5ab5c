use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marketplace listing - an item a user offers for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub description: String,
    /// Price in cents.
    pub price_cents: u64,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn new(
        seller_id: Uuid,
        title: String,
        description: String,
        price_cents: u64,
        image_urls: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            seller_id,
            title,
            description,
            price_cents,
            image_urls,
            created_at: Utc::now(),
        }
    }
}
