//! Usage ledger trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entry::UsageLogEntry;
use crate::domain::DomainError;

/// Append-only ledger of redemption attempts
///
/// Write-once, read-many: no update or delete operation is exposed.
#[async_trait]
pub trait UsageLedger: Send + Sync + Debug {
    /// Append an entry
    async fn append(&self, entry: UsageLogEntry) -> Result<(), DomainError>;

    /// Total entries ever appended
    async fn count_all(&self) -> Result<u64, DomainError>;

    /// Most recent entries, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<UsageLogEntry>, DomainError>;
}
