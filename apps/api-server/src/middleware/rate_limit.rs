//! Rate limiting middleware.

use std::future::{Ready, ready};
use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
};
use futures::future::LocalBoxFuture;

use campus_core::ports::{RateLimiter, TokenService};
use campus_core::{Decision, IdentityKey, RateLimitPolicy};
use campus_shared::ErrorResponse;

use super::auth::bearer_claims;

/// Applies one policy to the wrapped scope or resource.
///
/// Rejected requests get a 429 and never reach the handler.
pub struct RateLimitMiddleware {
    limiter: Arc<dyn RateLimiter>,
    tokens: Arc<dyn TokenService>,
    policy: Arc<RateLimitPolicy>,
    trust_forwarded: bool,
}

impl RateLimitMiddleware {
    pub fn new(
        limiter: Arc<dyn RateLimiter>,
        tokens: Arc<dyn TokenService>,
        policy: RateLimitPolicy,
    ) -> Self {
        Self {
            limiter,
            tokens,
            policy: Arc::new(policy),
            trust_forwarded: false,
        }
    }

    /// Key anonymous clients by `Forwarded`/`X-Forwarded-For` rather than the
    /// peer socket address.
    pub fn trust_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded = trust;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            tokens: self.tokens.clone(),
            policy: self.policy.clone(),
            trust_forwarded: self.trust_forwarded,
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: Arc<dyn RateLimiter>,
    tokens: Arc<dyn TokenService>,
    policy: Arc<RateLimitPolicy>,
    trust_forwarded: bool,
}

impl<S> RateLimitMiddlewareService<S> {
    /// Authenticated user id, else client address, else `unknown`.
    fn identity_key(&self, req: &ServiceRequest) -> IdentityKey {
        let subject = bearer_claims(req.headers(), self.tokens.as_ref())
            .ok()
            .map(|claims| claims.user_id.to_string());

        let origin = if self.trust_forwarded {
            req.connection_info()
                .realip_remote_addr()
                .map(str::to_string)
        } else {
            req.peer_addr().map(|addr| addr.ip().to_string())
        };

        IdentityKey::new(self.policy.name(), subject.as_deref(), origin.as_deref())
    }
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let limiter = self.limiter.clone();
        let policy = self.policy.clone();
        let key = self.identity_key(&req);

        Box::pin(async move {
            match limiter.check(&policy, &key).await {
                Decision::Admit => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Decision::Reject { retry_after_secs } => {
                    tracing::warn!(
                        key = %key,
                        policy = policy.name(),
                        retry_after_secs,
                        "Rate limit exceeded"
                    );

                    let response = HttpResponse::TooManyRequests()
                        .insert_header((header::RETRY_AFTER, retry_after_secs.to_string()))
                        .json(ErrorResponse::rate_limited(
                            policy.rejection_message(),
                            retry_after_secs,
                        ));

                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, http::StatusCode, test, web};
    use async_trait::async_trait;
    use campus_infra::{JwtConfig, JwtTokenService};
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records the keys it sees and answers with a fixed decision.
    struct FixedLimiter {
        decision: Decision,
        keys: Mutex<Vec<String>>,
    }

    impl FixedLimiter {
        fn new(decision: Decision) -> Arc<Self> {
            Arc::new(Self {
                decision,
                keys: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RateLimiter for FixedLimiter {
        async fn check(&self, _policy: &RateLimitPolicy, key: &IdentityKey) -> Decision {
            self.keys.lock().unwrap().push(key.to_string());
            self.decision
        }
    }

    fn tokens() -> Arc<JwtTokenService> {
        Arc::new(JwtTokenService::new(JwtConfig {
            secret: "middleware-test".to_string(),
            expiration_hours: 1,
            issuer: "campus-test".to_string(),
        }))
    }

    fn policy() -> RateLimitPolicy {
        RateLimitPolicy::new(
            "comment",
            Duration::from_secs(60),
            10,
            "Too many comments, please slow down.",
        )
        .unwrap()
    }

    #[actix_web::test]
    async fn test_reject_short_circuits_handler() {
        let limiter = FixedLimiter::new(Decision::Reject { retry_after_secs: 42 });
        let hits = Arc::new(AtomicUsize::new(0));
        let handler_hits = hits.clone();

        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(limiter, tokens(), policy()))
                .route(
                    "/",
                    web::get().to(move || {
                        let hits = handler_hits.clone();
                        async move {
                            hits.fetch_add(1, Ordering::SeqCst);
                            HttpResponse::Ok().finish()
                        }
                    }),
                ),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers().get(header::RETRY_AFTER).unwrap(), "42");
        let body: Value = test::read_body_json(res).await;
        assert_eq!(
            body,
            json!({
                "success": false,
                "error": "Too many comments, please slow down.",
                "retryAfter": 42
            })
        );
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn test_admit_passes_through() {
        let limiter = FixedLimiter::new(Decision::Admit);
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(limiter, tokens(), policy()))
                .route("/", web::get().to(|| async { HttpResponse::Ok().body("hello") })),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(test::read_body(res).await, "hello");
    }

    #[actix_web::test]
    async fn test_key_uses_subject_then_address_then_unknown() {
        let limiter = FixedLimiter::new(Decision::Admit);
        let tokens = tokens();
        let user_id = uuid::Uuid::new_v4();
        let token = tokens.generate_token(user_id, "ada@college.edu").unwrap();

        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(
                    limiter.clone(),
                    tokens.clone(),
                    policy(),
                ))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let authed = test::TestRequest::get()
            .uri("/")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .insert_header(("x-forwarded-for", "10.1.2.3"))
            .to_request();
        test::call_service(&app, authed).await;

        // Forwarded headers are client-controlled; the socket address wins.
        let forwarded = test::TestRequest::get()
            .uri("/")
            .peer_addr("203.0.113.9:40000".parse().unwrap())
            .insert_header(("x-forwarded-for", "10.1.2.3"))
            .to_request();
        test::call_service(&app, forwarded).await;

        let bad_token = test::TestRequest::get()
            .uri("/")
            .insert_header((header::AUTHORIZATION, "Bearer nope"))
            .to_request();
        test::call_service(&app, bad_token).await;

        let keys = limiter.keys.lock().unwrap().clone();
        assert_eq!(
            keys,
            vec![
                format!("comment:user:{}", user_id),
                "comment:ip:203.0.113.9".to_string(),
                "comment:ip:unknown".to_string(),
            ]
        );
    }

    #[actix_web::test]
    async fn test_forwarded_address_used_only_when_trusted() {
        let limiter = FixedLimiter::new(Decision::Admit);
        let app = test::init_service(
            App::new()
                .wrap(
                    RateLimitMiddleware::new(limiter.clone(), tokens(), policy())
                        .trust_forwarded_headers(true),
                )
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .peer_addr("203.0.113.9:40000".parse().unwrap())
            .insert_header(("x-forwarded-for", "10.1.2.3"))
            .to_request();
        test::call_service(&app, req).await;

        let keys = limiter.keys.lock().unwrap().clone();
        assert_eq!(keys, vec!["comment:ip:10.1.2.3".to_string()]);
    }
}
