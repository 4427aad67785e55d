//! In-memory usage ledger implementation

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::usage::{UsageLedger, UsageLogEntry};
use crate::domain::DomainError;

/// In-memory implementation of [`UsageLedger`]
///
/// Entries accumulate in append order and are never removed, matching the
/// write-once contract. Useful for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryUsageLedger {
    entries: RwLock<Vec<UsageLogEntry>>,
}

impl InMemoryUsageLedger {
    /// Create a new empty ledger
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageLedger for InMemoryUsageLedger {
    async fn append(&self, entry: UsageLogEntry) -> Result<(), DomainError> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn count_all(&self) -> Result<u64, DomainError> {
        Ok(self.entries.read().await.len() as u64)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<UsageLogEntry>, DomainError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::usage::UsageOutcome;

    fn entry(api_key: &str, outcome: UsageOutcome) -> UsageLogEntry {
        UsageLogEntry::new(api_key, "203.0.113.7", outcome, "")
    }

    #[tokio::test]
    async fn test_append_and_count() {
        let ledger = InMemoryUsageLedger::new();

        ledger
            .append(entry("token-1", UsageOutcome::Success))
            .await
            .unwrap();
        ledger
            .append(entry("token-1", UsageOutcome::QuotaExhausted))
            .await
            .unwrap();

        assert_eq!(ledger.count_all().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_ledger() {
        let ledger = InMemoryUsageLedger::new();

        assert_eq!(ledger.count_all().await.unwrap(), 0);
        assert!(ledger.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_newest_first() {
        let ledger = InMemoryUsageLedger::new();

        for i in 0..5 {
            ledger
                .append(entry(&format!("token-{}", i), UsageOutcome::Success))
                .await
                .unwrap();
        }

        let recent = ledger.recent(3).await.unwrap();

        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].api_key, "token-4");
        assert_eq!(recent[2].api_key, "token-2");
    }

    #[tokio::test]
    async fn test_recent_limit_above_len() {
        let ledger = InMemoryUsageLedger::new();

        ledger
            .append(entry("token-1", UsageOutcome::Success))
            .await
            .unwrap();

        assert_eq!(ledger.recent(100).await.unwrap().len(), 1);
    }
}
