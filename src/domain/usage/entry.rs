//! Usage ledger entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::api_key::Denial;

/// Unique identifier for a ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageEntryId(String);

impl UsageEntryId {
    /// Create an ID from a known value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new unique ID
    pub fn generate() -> Self {
        Self(format!("usage-{}", uuid::Uuid::new_v4()))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UsageEntryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UsageEntryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for UsageEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logged outcome of a redemption attempt
///
/// Rate-limited attempts are deliberately absent: they are refused before any
/// durable state is touched and never reach the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageOutcome {
    /// Quota was charged and generation may proceed
    Success,
    /// Unknown key
    NotFound,
    /// Deactivated key
    Inactive,
    /// Quota already consumed
    QuotaExhausted,
}

impl UsageOutcome {
    /// Ledger outcome for a denial, if that denial is logged at all
    pub fn from_denial(denial: Denial) -> Option<Self> {
        match denial {
            Denial::NotFound => Some(Self::NotFound),
            Denial::Inactive => Some(Self::Inactive),
            Denial::QuotaExhausted => Some(Self::QuotaExhausted),
            Denial::RateLimited => None,
        }
    }

    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::Inactive => "inactive",
            Self::QuotaExhausted => "quota_exhausted",
        }
    }

    /// Parse the storage representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "not_found" => Some(Self::NotFound),
            "inactive" => Some(Self::Inactive),
            "quota_exhausted" => Some(Self::QuotaExhausted),
            _ => None,
        }
    }
}

impl std::fmt::Display for UsageOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single immutable ledger entry
///
/// Entries are written once and never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLogEntry {
    /// Unique ID
    id: UsageEntryId,
    /// Token of the key that was presented
    pub api_key: String,
    /// Identifier of the calling client
    pub client_id: String,
    /// What happened
    pub outcome: UsageOutcome,
    /// Free-form context (e.g. the denial message or the template generated)
    pub detail: String,
    /// When the attempt was made
    pub created_at: DateTime<Utc>,
}

impl UsageLogEntry {
    /// Create a new entry stamped with the current time
    pub fn new(
        api_key: impl Into<String>,
        client_id: impl Into<String>,
        outcome: UsageOutcome,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            id: UsageEntryId::generate(),
            api_key: api_key.into(),
            client_id: client_id.into(),
            outcome,
            detail: detail.into(),
            created_at: Utc::now(),
        }
    }

    /// Reconstruct an entry from stored fields
    pub fn from_record(
        id: impl Into<UsageEntryId>,
        api_key: impl Into<String>,
        client_id: impl Into<String>,
        outcome: UsageOutcome,
        detail: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            api_key: api_key.into(),
            client_id: client_id.into(),
            outcome,
            detail: detail.into(),
            created_at,
        }
    }

    /// Get the entry ID
    pub fn id(&self) -> &UsageEntryId {
        &self.id
    }

    /// Whether this entry records a granted redemption
    pub fn is_success(&self) -> bool {
        self.outcome == UsageOutcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let entry = UsageLogEntry::new("token-1", "203.0.113.7", UsageOutcome::Success, "invoice");

        assert!(entry.id().as_str().starts_with("usage-"));
        assert_eq!(entry.api_key, "token-1");
        assert_eq!(entry.client_id, "203.0.113.7");
        assert!(entry.is_success());
    }

    #[test]
    fn test_generated_ids_unique() {
        let a = UsageEntryId::generate();
        let b = UsageEntryId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_outcome_from_denial() {
        assert_eq!(
            UsageOutcome::from_denial(Denial::NotFound),
            Some(UsageOutcome::NotFound)
        );
        assert_eq!(
            UsageOutcome::from_denial(Denial::Inactive),
            Some(UsageOutcome::Inactive)
        );
        assert_eq!(
            UsageOutcome::from_denial(Denial::QuotaExhausted),
            Some(UsageOutcome::QuotaExhausted)
        );
        // Rate-limited attempts never reach the ledger
        assert_eq!(UsageOutcome::from_denial(Denial::RateLimited), None);
    }

    #[test]
    fn test_outcome_roundtrip() {
        for outcome in [
            UsageOutcome::Success,
            UsageOutcome::NotFound,
            UsageOutcome::Inactive,
            UsageOutcome::QuotaExhausted,
        ] {
            assert_eq!(UsageOutcome::parse(outcome.as_str()), Some(outcome));
        }
        assert_eq!(UsageOutcome::parse("rate_limited"), None);
    }
}
