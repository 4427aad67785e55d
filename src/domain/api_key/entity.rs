//! API Key entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::template::TemplateId;

/// Status of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyStatus {
    /// Key is active and can be redeemed
    #[default]
    Active,
    /// Key has been deactivated; no redemption is possible
    Inactive,
}

impl ApiKeyStatus {
    /// Check if the key is usable
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// Parse the storage representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApiKeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reason a redemption was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Denial {
    /// The key is unknown
    NotFound,
    /// The key has been deactivated
    Inactive,
    /// The usage quota has been fully consumed
    QuotaExhausted,
    /// Too many requests from this (key, client) pair in the current window
    RateLimited,
}

impl Denial {
    /// Human-readable message surfaced to the caller
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotFound => "API key not found",
            Self::Inactive => "API key is deactivated",
            Self::QuotaExhausted => "usage limit exhausted",
            Self::RateLimited => "rate limit exceeded",
        }
    }
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Outcome of a non-mutating key check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCheck {
    /// The key may be redeemed against this template
    Valid(TemplateId),
    /// The key must be refused
    Denied(Denial),
}

/// Outcome of an atomic quota debit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDebit {
    /// The usage counter was incremented
    Charged,
    /// The key was already exhausted or deactivated; nothing changed
    Exhausted,
}

/// Result of a full redemption transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    /// The caller may proceed with generation against this template
    Granted(TemplateId),
    /// The redemption was refused
    Denied(Denial),
}

impl Redemption {
    /// Check whether the redemption succeeded
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// Per-(key, client) request throttling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Window length in seconds
    pub period_secs: u64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: 10,
            period_secs: 60,
        }
    }
}

impl RateLimitPolicy {
    /// Create a new policy
    pub fn new(max_requests: u32, period_secs: u64) -> Self {
        Self {
            max_requests,
            period_secs,
        }
    }
}

/// Aggregate accounting counters for the admin surface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStats {
    /// Keys ever issued
    pub total_keys: u64,
    /// Keys currently active
    pub active_keys: u64,
    /// Sum of `used` across all keys
    pub total_usage: u64,
    /// Total ledger entries (every logged redemption attempt)
    pub total_requests: u64,
}

/// API Key entity
///
/// The token doubles as the primary identifier; `used` only ever grows, and
/// only through [`ApiKey::debit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    /// The opaque token presented by callers
    token: String,
    /// Template this key is scoped to
    template_id: TemplateId,
    /// Maximum permitted successful redemptions
    limit: u32,
    /// Successful redemptions so far
    used: u32,
    /// Current status
    status: ApiKeyStatus,
    /// Creation timestamp
    created_at: DateTime<Utc>,
}

impl ApiKey {
    /// Create a freshly issued key
    pub fn new(token: impl Into<String>, template_id: TemplateId, limit: u32) -> Self {
        Self {
            token: token.into(),
            template_id,
            limit,
            used: 0,
            status: ApiKeyStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// Reconstruct a key from stored fields
    pub fn from_record(
        token: impl Into<String>,
        template_id: TemplateId,
        limit: u32,
        used: u32,
        status: ApiKeyStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            template_id,
            limit,
            used,
            status,
            created_at,
        }
    }

    /// Override the creation timestamp
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    // Getters

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn template_id(&self) -> &TemplateId {
        &self.template_id
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn status(&self) -> ApiKeyStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Redemptions still permitted
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    /// Whether the quota is fully consumed
    pub fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }

    /// Non-mutating redemption check: status first, then quota
    pub fn check(&self) -> KeyCheck {
        if !self.status.is_usable() {
            return KeyCheck::Denied(Denial::Inactive);
        }

        if self.is_exhausted() {
            return KeyCheck::Denied(Denial::QuotaExhausted);
        }

        KeyCheck::Valid(self.template_id.clone())
    }

    /// Conditionally consume one unit of quota
    ///
    /// Increments `used` only while the key is active and below its limit.
    /// Callers must hold whatever per-key exclusion the store provides so the
    /// check and increment are indivisible.
    pub fn debit(&mut self) -> QuotaDebit {
        if !self.status.is_usable() || self.is_exhausted() {
            return QuotaDebit::Exhausted;
        }

        self.used += 1;
        QuotaDebit::Charged
    }

    /// Deactivate the key; idempotent, one-way
    pub fn deactivate(&mut self) {
        self.status = ApiKeyStatus::Inactive;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key(limit: u32) -> ApiKey {
        let template_id = TemplateId::new("invoice").unwrap();
        ApiKey::new("k".repeat(32), template_id, limit)
    }

    #[test]
    fn test_new_key_defaults() {
        let key = test_key(5);

        assert_eq!(key.used(), 0);
        assert_eq!(key.limit(), 5);
        assert_eq!(key.remaining(), 5);
        assert_eq!(key.status(), ApiKeyStatus::Active);
        assert!(!key.is_exhausted());
    }

    #[test]
    fn test_check_active_key() {
        let key = test_key(1);

        assert_eq!(
            key.check(),
            KeyCheck::Valid(TemplateId::new("invoice").unwrap())
        );
    }

    #[test]
    fn test_check_inactive_wins_over_quota() {
        let mut key = test_key(1);
        while key.debit() == QuotaDebit::Charged {}
        key.deactivate();

        // Deactivated keys always read as inactive, never quota-exhausted
        assert_eq!(key.check(), KeyCheck::Denied(Denial::Inactive));
    }

    #[test]
    fn test_check_exhausted_key() {
        let mut key = test_key(2);
        assert_eq!(key.debit(), QuotaDebit::Charged);
        assert_eq!(key.debit(), QuotaDebit::Charged);

        assert_eq!(key.check(), KeyCheck::Denied(Denial::QuotaExhausted));
        assert_eq!(key.debit(), QuotaDebit::Exhausted);
        assert_eq!(key.used(), 2);
    }

    #[test]
    fn test_debit_stops_at_limit() {
        let mut key = test_key(3);

        let mut charged = 0;
        for _ in 0..10 {
            if key.debit() == QuotaDebit::Charged {
                charged += 1;
            }
        }

        assert_eq!(charged, 3);
        assert_eq!(key.used(), 3);
    }

    #[test]
    fn test_debit_refused_when_inactive() {
        let mut key = test_key(3);
        key.deactivate();

        assert_eq!(key.debit(), QuotaDebit::Exhausted);
        assert_eq!(key.used(), 0);
    }

    #[test]
    fn test_deactivate_idempotent() {
        let mut key = test_key(1);

        key.deactivate();
        key.deactivate();
        assert_eq!(key.status(), ApiKeyStatus::Inactive);
    }

    #[test]
    fn test_status_roundtrip() {
        assert_eq!(ApiKeyStatus::parse("active"), Some(ApiKeyStatus::Active));
        assert_eq!(
            ApiKeyStatus::parse("inactive"),
            Some(ApiKeyStatus::Inactive)
        );
        assert_eq!(ApiKeyStatus::parse("revoked"), None);
        assert_eq!(ApiKeyStatus::Active.as_str(), "active");
    }

    #[test]
    fn test_denial_messages() {
        assert_eq!(Denial::RateLimited.to_string(), "rate limit exceeded");
        assert_eq!(Denial::QuotaExhausted.to_string(), "usage limit exhausted");
    }

    #[test]
    fn test_redemption_is_granted() {
        let granted = Redemption::Granted(TemplateId::new("invoice").unwrap());
        assert!(granted.is_granted());
        assert!(!Redemption::Denied(Denial::NotFound).is_granted());
    }

    #[test]
    fn test_rate_limit_policy_default() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.max_requests, 10);
        assert_eq!(policy.period_secs, 60);
    }
}
