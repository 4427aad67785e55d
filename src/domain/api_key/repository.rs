//! API Key repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{ApiKey, ApiKeyStatus, QuotaDebit};
use crate::domain::DomainError;

/// Repository trait for the key store
///
/// Implementations must make [`record_usage`](ApiKeyRepository::record_usage)
/// atomic per key: two concurrent debits of the same key may never both pass
/// the quota gate. Unrelated keys must not contend with each other.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync + Debug {
    /// Get a key by its token
    async fn get(&self, token: &str) -> Result<Option<ApiKey>, DomainError>;

    /// Insert a newly issued key; `Conflict` if the token already exists
    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError>;

    /// List all keys, newest first
    async fn list(&self) -> Result<Vec<ApiKey>, DomainError>;

    /// Count keys (optionally filtered by status)
    async fn count(&self, status: Option<ApiKeyStatus>) -> Result<u64, DomainError>;

    /// Sum of `used` across all keys
    async fn total_usage(&self) -> Result<u64, DomainError>;

    /// Atomically consume one unit of quota
    ///
    /// Increments `used` only while the key is active and below its limit,
    /// reporting whether the debit was charged. `NotFound` if the token is
    /// unknown.
    async fn record_usage(&self, token: &str) -> Result<QuotaDebit, DomainError>;

    /// Set the key inactive; returns false when the token is unknown
    async fn deactivate(&self, token: &str) -> Result<bool, DomainError>;

    /// Check if a token exists
    async fn exists(&self, token: &str) -> Result<bool, DomainError> {
        Ok(self.get(token).await?.is_some())
    }
}
