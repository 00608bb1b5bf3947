pub mod auth;

pub use auth::{auth_middleware, parse_bearer, AuthGate, AuthRejection, AuthUser, HeaderError, Principal};
