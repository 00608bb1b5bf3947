use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// Minimum signing secret length accepted in production.
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct OrgConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub mongodb: MongoConfig,
    pub token: TokenConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub signing_secret: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub signin_attempts: u32,
    pub signin_window_seconds: u64,
    pub signup_attempts: u32,
    pub signup_window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            signin_attempts: 5,
            signin_window_seconds: 900,
            signup_attempts: 3,
            signup_window_seconds: 3600,
        }
    }
}

impl OrgConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment: Environment = lookup("ENVIRONMENT")
            .unwrap_or_else(|| "dev".to_string())
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;
        let var = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);
        let defaults = RateLimitConfig::default();

        let config = OrgConfig {
            common,
            environment: environment.clone(),
            service_name: var("SERVICE_NAME", Some("org-service"))?,
            service_version: var("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")))?,
            log_level: var("LOG_LEVEL", Some("info"))?,
            otlp_endpoint: lookup("OTLP_ENDPOINT").filter(|s| !s.trim().is_empty()),
            mongodb: MongoConfig {
                uri: var("MONGODB_URI", Some("mongodb://localhost:27017"))?,
                database: var("MONGODB_DATABASE", Some("org_service"))?,
            },
            token: TokenConfig {
                // Never defaulted, in any environment.
                signing_secret: Secret::new(get_env_required(&lookup, "TOKEN_SIGNING_SECRET")?),
            },
            security: SecurityConfig {
                allowed_origins: var("ALLOWED_ORIGINS", Some("http://localhost:3000"))?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            rate_limit: RateLimitConfig {
                signin_attempts: parse(
                    "RATE_LIMIT_SIGNIN_ATTEMPTS",
                    var(
                        "RATE_LIMIT_SIGNIN_ATTEMPTS",
                        Some(&defaults.signin_attempts.to_string()),
                    )?,
                )?,
                signin_window_seconds: parse(
                    "RATE_LIMIT_SIGNIN_WINDOW_SECONDS",
                    var(
                        "RATE_LIMIT_SIGNIN_WINDOW_SECONDS",
                        Some(&defaults.signin_window_seconds.to_string()),
                    )?,
                )?,
                signup_attempts: parse(
                    "RATE_LIMIT_SIGNUP_ATTEMPTS",
                    var(
                        "RATE_LIMIT_SIGNUP_ATTEMPTS",
                        Some(&defaults.signup_attempts.to_string()),
                    )?,
                )?,
                signup_window_seconds: parse(
                    "RATE_LIMIT_SIGNUP_WINDOW_SECONDS",
                    var(
                        "RATE_LIMIT_SIGNUP_WINDOW_SECONDS",
                        Some(&defaults.signup_window_seconds.to_string()),
                    )?,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_prod(&self) -> bool {
        self.environment == Environment::Prod
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        let secret_len = self.token.signing_secret.expose_secret().len();
        if secret_len == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOKEN_SIGNING_SECRET must not be empty"
            )));
        }

        if self.rate_limit.signin_attempts == 0 || self.rate_limit.signup_attempts == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Rate limit attempts must be greater than 0"
            )));
        }

        if self.is_prod() {
            if secret_len < MIN_SECRET_BYTES {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "TOKEN_SIGNING_SECRET must be at least {} bytes in production",
                    MIN_SECRET_BYTES
                )));
            }

            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }
        }

        Ok(())
    }
}

fn get_env<F>(lookup: &F, key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn get_env_required<F>(lookup: &F, key: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| AppError::ConfigError(anyhow::anyhow!("{} is required but not set", key)))
}

fn parse<T>(key: &str, value: String) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("Invalid {}: {}", key, e)))
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const PROD_SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> Result<OrgConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        OrgConfig::from_lookup(core_config::Config::default(), |key| vars.get(key).cloned())
    }

    fn prod_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("ENVIRONMENT", "prod"),
            ("SERVICE_NAME", "org-service"),
            ("SERVICE_VERSION", "1.0.0"),
            ("LOG_LEVEL", "info"),
            ("MONGODB_URI", "mongodb://db:27017"),
            ("MONGODB_DATABASE", "orgs"),
            ("TOKEN_SIGNING_SECRET", PROD_SECRET),
            ("ALLOWED_ORIGINS", "https://app.example.com"),
            ("RATE_LIMIT_SIGNIN_ATTEMPTS", "5"),
            ("RATE_LIMIT_SIGNIN_WINDOW_SECONDS", "900"),
            ("RATE_LIMIT_SIGNUP_ATTEMPTS", "3"),
            ("RATE_LIMIT_SIGNUP_WINDOW_SECONDS", "3600"),
        ]
    }

    fn with(
        mut vars: Vec<(&'static str, &'static str)>,
        key: &'static str,
        value: &'static str,
    ) -> Vec<(&'static str, &'static str)> {
        vars.retain(|(k, _)| *k != key);
        vars.push((key, value));
        vars
    }

    #[test]
    fn test_dev_defaults() {
        let config = load(&[("TOKEN_SIGNING_SECRET", "dev")]).unwrap();
        assert_eq!(config.environment, Environment::Dev);
        assert_eq!(config.service_name, "org-service");
        assert_eq!(config.mongodb.database, "org_service");
        assert_eq!(config.rate_limit.signin_attempts, 5);
        assert_eq!(config.security.allowed_origins, vec!["http://localhost:3000"]);
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn test_secret_is_always_required() {
        assert!(load(&[]).is_err());
        assert!(load(&[("TOKEN_SIGNING_SECRET", "")]).is_err());
    }

    #[test]
    fn test_secret_not_in_debug_output() {
        let config = load(&prod_vars()).unwrap();
        assert!(!format!("{:?}", config).contains(PROD_SECRET));
    }

    #[test]
    fn test_prod_requires_every_variable() {
        assert!(load(&prod_vars()).is_ok());

        let mut missing = prod_vars();
        missing.retain(|(k, _)| *k != "MONGODB_URI");
        assert!(load(&missing).is_err());
    }

    #[test]
    fn test_prod_rejects_short_secret() {
        assert!(load(&with(prod_vars(), "TOKEN_SIGNING_SECRET", "too-short")).is_err());
    }

    #[test]
    fn test_prod_rejects_wildcard_cors() {
        assert!(load(&with(prod_vars(), "ALLOWED_ORIGINS", "*")).is_err());
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("TOKEN_SIGNING_SECRET", "dev"), ("ENVIRONMENT", "staging")]).is_err());
        assert!(load(&[
            ("TOKEN_SIGNING_SECRET", "dev"),
            ("RATE_LIMIT_SIGNIN_ATTEMPTS", "many")
        ])
        .is_err());
    }

    #[test]
    fn test_origins_are_split_and_trimmed() {
        let config = load(&[
            ("TOKEN_SIGNING_SECRET", "dev"),
            ("ALLOWED_ORIGINS", "https://a.example.com, https://b.example.com"),
        ])
        .unwrap();
        assert_eq!(
            config.security.allowed_origins,
            vec!["https://a.example.com", "https://b.example.com"]
        );
    }

    #[test]
    fn test_rejects_port_zero() {
        let common = core_config::Config {
            port: 0,
            ..core_config::Config::default()
        };
        let result = OrgConfig::from_lookup(common, |key| {
            (key == "TOKEN_SIGNING_SECRET").then(|| "dev".to_string())
        });
        assert!(result.is_err());
    }
}
