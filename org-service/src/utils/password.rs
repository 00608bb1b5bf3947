use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;

/// Stand-in hash verified when the account does not exist.
static DUMMY_HASH: OnceLock<Option<PasswordHashString>> = OnceLock::new();

/// Plaintext password. `Debug` never prints the value.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// PHC-formatted Argon2 hash as stored on the user record.
#[derive(Debug, Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Hash with Argon2id and a fresh random salt.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(PasswordHashString::new(hash))
}

pub fn verify_password(
    password: &Password,
    password_hash: &PasswordHashString,
) -> Result<(), anyhow::Error> {
    let parsed = PasswordHash::new(password_hash.as_str())
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed)
        .map_err(|_| anyhow::anyhow!("Password verification failed"))
}

/// Verify against `password_hash`, or against a throwaway hash when there is none.
///
/// Both paths run one Argon2 verification, so an unknown account takes as long
/// to reject as a wrong password. Without a stored hash the result is always an error.
pub fn verify_password_or_dummy(
    password: &Password,
    password_hash: Option<&PasswordHashString>,
) -> Result<(), anyhow::Error> {
    if let Some(hash) = password_hash {
        return verify_password(password, hash);
    }

    let dummy = DUMMY_HASH.get_or_init(|| {
        hash_password(&Password::new("placeholder-credential".to_string())).ok()
    });
    if let Some(dummy) = dummy {
        let _ = verify_password(password, dummy);
    }
    Err(anyhow::anyhow!("Password verification failed"))
}
