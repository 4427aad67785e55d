//! API Key domain
//!
//! Domain types and traits for metered API keys: the key record itself,
//! redemption outcomes, and the store contract.

mod entity;
mod repository;
mod validation;

pub use entity::{
    AccountStats, ApiKey, ApiKeyStatus, Denial, KeyCheck, QuotaDebit, RateLimitPolicy, Redemption,
};
pub use repository::ApiKeyRepository;
pub use validation::{validate_token, TokenValidationError, TOKEN_LENGTH};

#[cfg(test)]
pub use repository::mock;
