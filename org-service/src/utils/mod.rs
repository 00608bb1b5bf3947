pub mod password;
pub mod validation;

pub use password::{
    hash_password, verify_password, verify_password_or_dummy, Password, PasswordHashString,
};
pub use validation::ValidatedJson;

/// Canonical form used for every stored and compared email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
