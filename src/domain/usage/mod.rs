//! Usage ledger domain
//!
//! The append-only audit trail of redemption attempts.

mod entry;
mod repository;

pub use entry::{UsageEntryId, UsageLogEntry, UsageOutcome};
pub use repository::UsageLedger;

#[cfg(test)]
pub use repository::mock;
