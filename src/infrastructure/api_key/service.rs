//! Key accounting service
//!
//! Provides the redemption transaction and the admin-facing key operations.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::api_key::{
    validate_token, AccountStats, ApiKey, ApiKeyRepository, ApiKeyStatus, Denial, KeyCheck,
    QuotaDebit, RateLimitPolicy, Redemption,
};
use crate::domain::template::TemplateId;
use crate::domain::usage::{UsageLedger, UsageLogEntry, UsageOutcome};
use crate::domain::DomainError;

use super::generator::KeyTokenGenerator;
use super::rate_limiter::RateLimiter;

/// Issuance retries before a token collision is treated as store trouble
const MAX_ISSUE_ATTEMPTS: u32 = 5;

/// Key accounting service
///
/// Orchestrates one redemption as rate-limit check, validation, quota debit,
/// ledger append. Rate limiting runs first so abusive retry storms never
/// touch the key store or the ledger.
#[derive(Debug)]
pub struct AccountingService {
    keys: Arc<dyn ApiKeyRepository>,
    ledger: Arc<dyn UsageLedger>,
    generator: KeyTokenGenerator,
    rate_limiter: Arc<RateLimiter>,
}

impl AccountingService {
    /// Create a new accounting service
    pub fn new(keys: Arc<dyn ApiKeyRepository>, ledger: Arc<dyn UsageLedger>) -> Self {
        Self {
            keys,
            ledger,
            generator: KeyTokenGenerator::new(),
            rate_limiter: Arc::new(RateLimiter::new()),
        }
    }

    /// Create with a custom rate limiter
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Issue a new key scoped to `template_id` with a redemption quota
    ///
    /// The template identifier is taken at face value; its registry is an
    /// external collaborator. Token collisions are retried with a fresh
    /// token a bounded number of times before being surfaced as a storage
    /// failure.
    pub async fn issue(
        &self,
        template_id: TemplateId,
        limit: u32,
    ) -> Result<ApiKey, DomainError> {
        if limit == 0 {
            return Err(DomainError::validation("usage limit must be positive"));
        }

        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let token = self.generator.generate();
            let api_key = ApiKey::new(token, template_id.clone(), limit);

            match self.keys.create(api_key).await {
                Ok(created) => {
                    info!(
                        "API key issued: template={}, limit={}",
                        template_id, limit
                    );
                    return Ok(created);
                }
                Err(DomainError::Conflict { .. }) => {
                    warn!("token collision on issuance (attempt {})", attempt);
                }
                Err(e) => return Err(e),
            }
        }

        Err(DomainError::storage(format!(
            "could not allocate a unique token after {} attempts",
            MAX_ISSUE_ATTEMPTS
        )))
    }

    /// Check a key without mutating any state
    pub async fn validate(&self, token: &str) -> Result<KeyCheck, DomainError> {
        if validate_token(token).is_err() {
            debug!("malformed token presented");
            return Ok(KeyCheck::Denied(Denial::NotFound));
        }

        match self.keys.get(token).await? {
            Some(key) => Ok(key.check()),
            None => Ok(KeyCheck::Denied(Denial::NotFound)),
        }
    }

    /// Redeem a key on behalf of `client_id`
    ///
    /// Every denial except `RateLimited` leaves a ledger entry; rate-limited
    /// attempts are refused before any durable state is touched. The quota
    /// debit happens before its ledger entry so the entry records what
    /// actually happened when two redemptions race on the last unit.
    pub async fn redeem(
        &self,
        token: &str,
        client_id: &str,
        policy: &RateLimitPolicy,
    ) -> Result<Redemption, DomainError> {
        let decision = self.rate_limiter.check(token, client_id, policy);

        if !decision.allowed {
            debug!(
                "redemption rate-limited: client={}, retry_after={}s",
                client_id, decision.retry_after_secs
            );
            return Ok(Redemption::Denied(Denial::RateLimited));
        }

        let template_id = match self.validate(token).await? {
            KeyCheck::Valid(template_id) => template_id,
            KeyCheck::Denied(denial) => {
                self.log_denial(token, client_id, denial).await?;
                return Ok(Redemption::Denied(denial));
            }
        };

        match self.keys.record_usage(token).await? {
            QuotaDebit::Charged => {
                self.ledger
                    .append(UsageLogEntry::new(
                        token,
                        client_id,
                        UsageOutcome::Success,
                        format!("template '{}'", template_id),
                    ))
                    .await?;

                info!("redemption granted: template={}", template_id);
                Ok(Redemption::Granted(template_id))
            }
            QuotaDebit::Exhausted => {
                // Lost a race on the final unit of quota after validate
                self.log_denial(token, client_id, Denial::QuotaExhausted)
                    .await?;
                Ok(Redemption::Denied(Denial::QuotaExhausted))
            }
        }
    }

    /// Deactivate a key; idempotent, returns false for unknown tokens
    pub async fn deactivate(&self, token: &str) -> Result<bool, DomainError> {
        let found = self.keys.deactivate(token).await?;

        if found {
            info!("API key deactivated");
        } else {
            debug!("deactivation requested for unknown token");
        }

        Ok(found)
    }

    /// Get the record of a key
    pub async fn get_info(&self, token: &str) -> Result<Option<ApiKey>, DomainError> {
        self.keys.get(token).await
    }

    /// List all issued keys, newest first
    pub async fn list_keys(&self) -> Result<Vec<ApiKey>, DomainError> {
        self.keys.list().await
    }

    /// Aggregate accounting counters
    pub async fn stats(&self) -> Result<AccountStats, DomainError> {
        Ok(AccountStats {
            total_keys: self.keys.count(None).await?,
            active_keys: self.keys.count(Some(ApiKeyStatus::Active)).await?,
            total_usage: self.keys.total_usage().await?,
            total_requests: self.ledger.count_all().await?,
        })
    }

    /// Most recent ledger entries, newest first
    pub async fn recent_activity(
        &self,
        limit: usize,
    ) -> Result<Vec<UsageLogEntry>, DomainError> {
        self.ledger.recent(limit).await
    }

    async fn log_denial(
        &self,
        token: &str,
        client_id: &str,
        denial: Denial,
    ) -> Result<(), DomainError> {
        let Some(outcome) = UsageOutcome::from_denial(denial) else {
            return Ok(());
        };

        debug!("redemption denied: client={}, reason={}", client_id, denial);

        self.ledger
            .append(UsageLogEntry::new(
                token,
                client_id,
                outcome,
                denial.message(),
            ))
            .await
    }
}
