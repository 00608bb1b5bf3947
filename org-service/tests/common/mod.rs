//! Shared setup for org-service integration tests.
//!
//! Builds the full router over an `InMemoryStore` with a `ManualClock`, so
//! token expiry can be driven without sleeping.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use org_service::{
    build_router,
    config::OrgConfig,
    repository::InMemoryStore,
    services::{Clock, ManualClock, TokenService},
    AppState,
};
use secrecy::Secret;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-signing-secret-0123456789";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
    pub tokens: TokenService,
}

pub struct Response {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_vars(&[])
    }

    /// Build with extra config variables on top of the test signing secret.
    pub fn with_vars(vars: &[(&str, &str)]) -> Self {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = OrgConfig::from_lookup(service_core::config::Config::default(), |key| {
            if key == "TOKEN_SIGNING_SECRET" {
                return Some(TEST_SECRET.to_string());
            }
            vars.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
        .expect("test config is valid");

        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));
        let tokens = TokenService::with_clock(Secret::new(TEST_SECRET.to_string()), clock.clone());
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(config, tokens.clone(), store.clone());

        Self {
            router: build_router(state.clone()),
            state,
            store,
            clock,
            tokens,
        }
    }

    /// Current test time as a unix timestamp.
    pub fn clock_now(&self) -> i64 {
        self.clock.now().timestamp()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        Response {
            status,
            headers,
            body,
        }
    }

    pub async fn signup(&self, name: &str, email: &str) -> Response {
        self.request(
            Method::POST,
            "/auth/signup",
            None,
            Some(serde_json::json!({
                "name": name,
                "email": email,
                "password": TEST_PASSWORD,
            })),
        )
        .await
    }

    pub async fn signin(&self, email: &str) -> Response {
        self.request(
            Method::POST,
            "/auth/signin",
            None,
            Some(serde_json::json!({ "email": email, "password": TEST_PASSWORD })),
        )
        .await
    }

    /// Sign up then sign in, returning `(access_token, refresh_token)`.
    pub async fn register(&self, name: &str, email: &str) -> (String, String) {
        assert_eq!(self.signup(name, email).await.status, StatusCode::CREATED);
        let res = self.signin(email).await;
        assert_eq!(res.status, StatusCode::OK, "signin failed: {}", res.body);
        (
            res.body["access_token"].as_str().unwrap().to_string(),
            res.body["refresh_token"].as_str().unwrap().to_string(),
        )
    }

    pub async fn create_org(&self, token: &str, name: &str) -> String {
        let res = self
            .request(
                Method::POST,
                "/organizations",
                Some(token),
                Some(serde_json::json!({ "name": name, "description": "test org" })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "create failed: {}", res.body);
        res.body["organization_id"].as_str().unwrap().to_string()
    }

    pub async fn invite(&self, token: &str, org_id: &str, email: &str) -> Response {
        self.request(
            Method::POST,
            &format!("/organizations/{}/invite", org_id),
            Some(token),
            Some(serde_json::json!({ "user_email": email })),
        )
        .await
    }
}
