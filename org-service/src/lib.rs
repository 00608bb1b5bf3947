pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod services;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::OrgConfig;
use crate::middleware::AuthGate;
use crate::repository::{HealthCheck, OrganizationRepository, UserRepository};
use crate::services::{AccessPolicy, TokenService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<OrgConfig>,
    pub tokens: TokenService,
    pub auth_gate: AuthGate,
    pub organizations: Arc<dyn OrganizationRepository>,
    pub users: Arc<dyn UserRepository>,
    pub health: Arc<dyn HealthCheck>,
    pub policy: AccessPolicy<dyn OrganizationRepository>,
    pub signin_rate_limiter: IpRateLimiter,
    pub signup_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire every collaborator to one backing store.
    pub fn new<S>(config: OrgConfig, tokens: TokenService, store: Arc<S>) -> Self
    where
        S: OrganizationRepository + UserRepository + HealthCheck + 'static,
    {
        let organizations: Arc<dyn OrganizationRepository> = store.clone();
        let signin_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.signin_attempts,
            config.rate_limit.signin_window_seconds,
        );
        let signup_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.signup_attempts,
            config.rate_limit.signup_window_seconds,
        );

        Self {
            config: Arc::new(config),
            auth_gate: AuthGate::new(tokens.clone()),
            tokens,
            policy: AccessPolicy::new(organizations.clone()),
            organizations,
            users: store.clone(),
            health: store,
            signin_rate_limiter,
            signup_rate_limiter,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let signin_route = Router::new()
        .route("/auth/signin", post(handlers::auth::signin))
        .layer(from_fn_with_state(
            state.signin_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let signup_route = Router::new()
        .route("/auth/signup", post(handlers::auth::signup))
        .layer(from_fn_with_state(
            state.signup_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let protected = Router::new()
        .route("/organizations", post(handlers::org::create_organization))
        .route(
            "/organizations/:id",
            get(handlers::org::get_organization)
                .put(handlers::org::update_organization)
                .delete(handlers::org::delete_organization),
        )
        .route(
            "/organizations/:id/invite",
            post(handlers::org::invite_member),
        )
        .route("/users/me", get(handlers::user::get_me))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .merge(signin_route)
        .merge(signup_route)
        .merge(protected)
        .with_state(state.clone())
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins))
}

/// A `*` entry allows any origin. tower-http rejects a wildcard inside an origin list.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
