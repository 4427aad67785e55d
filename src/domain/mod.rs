//! Domain layer - Core business logic and entities

pub mod api_key;
pub mod error;
pub mod template;
pub mod usage;

pub use api_key::{
    AccountStats, ApiKey, ApiKeyRepository, ApiKeyStatus, Denial, KeyCheck, QuotaDebit,
    RateLimitPolicy, Redemption,
};
pub use error::DomainError;
pub use template::{TemplateId, TemplateIdError};
pub use usage::{UsageEntryId, UsageLedger, UsageLogEntry, UsageOutcome};
