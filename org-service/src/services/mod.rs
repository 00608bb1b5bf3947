//! Token lifecycle and access decisions.

pub mod access;
pub mod clock;
pub mod metrics;
pub mod token_codec;
pub mod tokens;

pub use access::{AccessDecision, AccessError, AccessPolicy, PolicyError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use metrics::{get_metrics, init_metrics};
pub use token_codec::{Claims, TokenCodec, TokenError, TokenKind};
pub use tokens::{RefreshError, TokenPair, TokenService, ACCESS_TOKEN_TTL_SECONDS, REFRESH_TOKEN_TTL_SECONDS};
