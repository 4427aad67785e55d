//! API Key infrastructure implementations
//!
//! Token generation, key stores, rate limiting, and the accounting service.

mod generator;
mod postgres;
mod rate_limiter;
mod repository;
mod service;

pub use generator::KeyTokenGenerator;
pub use postgres::{PostgresApiKeyRepository, PostgresConfig};
pub use rate_limiter::{RateDecision, RateLimiter};
pub use repository::InMemoryApiKeyRepository;
pub use service::AccountingService;
