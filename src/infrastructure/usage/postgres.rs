//! PostgreSQL usage ledger implementation

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::usage::{UsageLedger, UsageLogEntry, UsageOutcome};
use crate::domain::DomainError;

/// PostgreSQL implementation of [`UsageLedger`]
///
/// Only INSERT and SELECT are ever issued against the table; the append-only
/// contract has no UPDATE or DELETE path.
#[derive(Debug, Clone)]
pub struct PostgresUsageLedger {
    pool: PgPool,
}

impl PostgresUsageLedger {
    /// Create a new ledger with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ensures the usage_logs table exists
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS usage_logs (
                id VARCHAR(64) PRIMARY KEY,
                api_key VARCHAR(64) NOT NULL,
                client_id VARCHAR(255) NOT NULL,
                outcome VARCHAR(32) NOT NULL,
                detail TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create usage_logs table: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl UsageLedger for PostgresUsageLedger {
    async fn append(&self, entry: UsageLogEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO usage_logs (id, api_key, client_id, outcome, detail, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id().as_str())
        .bind(&entry.api_key)
        .bind(&entry.client_id)
        .bind(entry.outcome.as_str())
        .bind(&entry.detail)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to append usage entry: {}", e)))?;

        Ok(())
    }

    async fn count_all(&self) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usage_logs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count usage entries: {}", e)))?;

        Ok(count as u64)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<UsageLogEntry>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, api_key, client_id, outcome, detail, created_at
            FROM usage_logs
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list usage entries: {}", e)))?;

        let mut entries = Vec::with_capacity(rows.len());

        for row in rows {
            entries.push(row_to_entry(&row)?);
        }

        Ok(entries)
    }
}

fn row_to_entry(row: &sqlx::postgres::PgRow) -> Result<UsageLogEntry, DomainError> {
    let id: String = row.get("id");
    let api_key: String = row.get("api_key");
    let client_id: String = row.get("client_id");
    let outcome: String = row.get("outcome");
    let detail: String = row.get("detail");
    let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");

    let outcome = UsageOutcome::parse(&outcome).ok_or_else(|| {
        DomainError::storage(format!("Invalid usage outcome in database: '{}'", outcome))
    })?;

    Ok(UsageLogEntry::from_record(
        id, api_key, client_id, outcome, detail, created_at,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_storage_values_parse_back() {
        for outcome in [
            UsageOutcome::Success,
            UsageOutcome::NotFound,
            UsageOutcome::Inactive,
            UsageOutcome::QuotaExhausted,
        ] {
            assert_eq!(UsageOutcome::parse(outcome.as_str()), Some(outcome));
        }
    }
}
