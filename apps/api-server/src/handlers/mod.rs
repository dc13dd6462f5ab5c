//! HTTP handlers and route configuration.

mod auth;
mod comments;
mod health;
mod listings;
mod uploads;

use actix_web::web;

use campus_core::RateLimitPolicy;

use crate::middleware::rate_limit::RateLimitMiddleware;
use crate::state::AppState;

/// Configure all application routes.
///
/// Every `/api` request counts against the general policy; the route classes
/// below additionally count against their own.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    let limit = |policy: &RateLimitPolicy| {
        RateLimitMiddleware::new(state.limiter.clone(), state.tokens.clone(), policy.clone())
            .trust_forwarded_headers(state.trust_forwarded_headers)
    };
    let policies = &state.policies;

    cfg.service(
        web::scope("/api")
            .wrap(limit(&policies.general))
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/auth")
                    .service(
                        web::resource("/register")
                            .wrap(limit(&policies.auth))
                            .route(web::post().to(auth::register)),
                    )
                    .service(
                        web::resource("/login")
                            .wrap(limit(&policies.auth))
                            .route(web::post().to(auth::login)),
                    )
                    .route("/me", web::get().to(auth::me)),
            )
            .service(
                web::resource("/uploads")
                    .wrap(limit(&policies.upload))
                    .route(web::post().to(uploads::upload)),
            )
            .service(
                web::resource("/posts/{post_id}/comments")
                    .wrap(limit(&policies.comment))
                    .route(web::post().to(comments::create_comment)),
            )
            .service(
                web::resource("/marketplace/listings")
                    .wrap(limit(&policies.listing))
                    .route(web::post().to(listings::create_listing)),
            ),
    );
}
