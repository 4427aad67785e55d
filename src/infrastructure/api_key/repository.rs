//! In-memory API key repository implementation

use async_trait::async_trait;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::api_key::{ApiKey, ApiKeyRepository, ApiKeyStatus, QuotaDebit};
use crate::domain::DomainError;

/// In-memory implementation of [`ApiKeyRepository`]
///
/// Keys live in a sharded concurrent map: mutation happens under the entry
/// guard, which makes the quota check-and-increment atomic per key while
/// leaving unrelated keys free of contention. Useful for tests and
/// single-process deployments; data is lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryApiKeyRepository {
    keys: DashMap<String, ApiKey>,
}

impl InMemoryApiKeyRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-populated with keys
    pub fn with_keys(keys: Vec<ApiKey>) -> Self {
        let repo = Self::new();
        for key in keys {
            repo.keys.insert(key.token().to_string(), key);
        }
        repo
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn get(&self, token: &str) -> Result<Option<ApiKey>, DomainError> {
        Ok(self.keys.get(token).map(|entry| entry.value().clone()))
    }

    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
        match self.keys.entry(api_key.token().to_string()) {
            Entry::Occupied(_) => Err(DomainError::conflict(format!(
                "API key '{}' already exists",
                api_key.token()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(api_key.clone());
                Ok(api_key)
            }
        }
    }

    async fn list(&self) -> Result<Vec<ApiKey>, DomainError> {
        let mut keys: Vec<ApiKey> = self.keys.iter().map(|entry| entry.value().clone()).collect();
        keys.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        Ok(keys)
    }

    async fn count(&self, status: Option<ApiKeyStatus>) -> Result<u64, DomainError> {
        let count = self
            .keys
            .iter()
            .filter(|entry| status.map_or(true, |s| entry.value().status() == s))
            .count();

        Ok(count as u64)
    }

    async fn total_usage(&self) -> Result<u64, DomainError> {
        Ok(self
            .keys
            .iter()
            .map(|entry| u64::from(entry.value().used()))
            .sum())
    }

    async fn record_usage(&self, token: &str) -> Result<QuotaDebit, DomainError> {
        // get_mut holds the shard write lock for the duration of the debit,
        // so the quota gate and the increment are indivisible for this key.
        match self.keys.get_mut(token) {
            Some(mut entry) => Ok(entry.value_mut().debit()),
            None => Err(DomainError::not_found(format!(
                "API key '{}' not found",
                token
            ))),
        }
    }

    async fn deactivate(&self, token: &str) -> Result<bool, DomainError> {
        match self.keys.get_mut(token) {
            Some(mut entry) => {
                entry.value_mut().deactivate();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
