mod organization;
mod user;

pub use organization::{AccessLevel, Membership, Organization};
pub use user::{SanitizedUser, User};
