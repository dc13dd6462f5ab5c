//! Marketplace listings.

use actix_web::{HttpResponse, web};

use campus_core::DomainError;
use campus_core::domain::Listing;
use campus_shared::ApiResponse;
use campus_shared::dto::{CreateListingRequest, ListingResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/marketplace/listings
pub async fn create_listing(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreateListingRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let title = req.title.trim().to_string();
    if title.is_empty() || title.chars().count() > 100 {
        return Err(
            DomainError::Validation("Title must be between 1 and 100 characters".to_string())
                .into(),
        );
    }
    if req.image_urls.len() > 5 {
        return Err(DomainError::Validation("At most 5 images per listing".to_string()).into());
    }

    let listing = state
        .listings
        .save(Listing::new(
            identity.user_id,
            title,
            req.description.trim().to_string(),
            req.price_cents,
            req.image_urls,
        ))
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok(ListingResponse {
        id: listing.id.to_string(),
        seller_id: listing.seller_id.to_string(),
        title: listing.title,
        description: listing.description,
        price_cents: listing.price_cents,
        image_urls: listing.image_urls,
        created_at: listing.created_at.to_rfc3339(),
    })))
}
