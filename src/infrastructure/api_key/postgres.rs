//! PostgreSQL API key repository implementation

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::domain::api_key::{ApiKey, ApiKeyRepository, ApiKeyStatus, QuotaDebit};
use crate::domain::template::TemplateId;
use crate::domain::DomainError;

/// PostgreSQL connection configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/docgen_gateway".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Open a connection pool with these settings
    pub async fn connect(&self) -> Result<PgPool, DomainError> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(self.connect_timeout_secs))
            .connect(&self.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))
    }
}

/// PostgreSQL implementation of [`ApiKeyRepository`]
///
/// The quota debit is a single conditional UPDATE, so concurrent redemptions
/// of one key serialize on the row while other keys proceed untouched.
#[derive(Debug, Clone)]
pub struct PostgresApiKeyRepository {
    pool: PgPool,
}

impl PostgresApiKeyRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ensures the api_keys table exists
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS api_keys (
                token VARCHAR(64) PRIMARY KEY,
                template_id VARCHAR(100) NOT NULL,
                limit_count INTEGER NOT NULL,
                used_count INTEGER NOT NULL DEFAULT 0,
                status VARCHAR(16) NOT NULL DEFAULT 'active',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create api_keys table: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl ApiKeyRepository for PostgresApiKeyRepository {
    async fn get(&self, token: &str) -> Result<Option<ApiKey>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT token, template_id, limit_count, used_count, status, created_at
            FROM api_keys
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get API key: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_api_key(&row)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO api_keys (token, template_id, limit_count, used_count, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(api_key.token())
        .bind(api_key.template_id().as_str())
        .bind(api_key.limit() as i32)
        .bind(api_key.used() as i32)
        .bind(api_key.status().as_str())
        .bind(api_key.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let msg = e.to_string();

            if msg.contains("duplicate key") || msg.contains("unique constraint") {
                DomainError::conflict(format!("API key '{}' already exists", api_key.token()))
            } else {
                DomainError::storage(format!("Failed to create API key: {}", e))
            }
        })?;

        Ok(api_key)
    }

    async fn list(&self) -> Result<Vec<ApiKey>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT token, template_id, limit_count, used_count, status, created_at
            FROM api_keys
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list API keys: {}", e)))?;

        let mut keys = Vec::with_capacity(rows.len());

        for row in rows {
            keys.push(row_to_api_key(&row)?);
        }

        Ok(keys)
    }

    async fn count(&self, status: Option<ApiKeyStatus>) -> Result<u64, DomainError> {
        let count: i64 = match status {
            Some(s) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM api_keys WHERE status = $1")
                    .bind(s.as_str())
                    .fetch_one(&self.pool)
                    .await
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM api_keys")
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(|e| DomainError::storage(format!("Failed to count API keys: {}", e)))?;

        Ok(count as u64)
    }

    async fn total_usage(&self) -> Result<u64, DomainError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(used_count), 0) FROM api_keys")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to sum usage: {}", e)))?;

        Ok(total as u64)
    }

    async fn record_usage(&self, token: &str) -> Result<QuotaDebit, DomainError> {
        // The WHERE clause is the quota gate: the row-level update either
        // charges one unit or leaves the row untouched, never both halves of
        // a lost update.
        let result = sqlx::query(
            r#"
            UPDATE api_keys
            SET used_count = used_count + 1
            WHERE token = $1 AND status = 'active' AND used_count < limit_count
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to record usage: {}", e)))?;

        if result.rows_affected() > 0 {
            return Ok(QuotaDebit::Charged);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM api_keys WHERE token = $1)")
                .bind(token)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to check API key: {}", e)))?;

        if exists {
            Ok(QuotaDebit::Exhausted)
        } else {
            Err(DomainError::not_found(format!(
                "API key '{}' not found",
                token
            )))
        }
    }

    async fn deactivate(&self, token: &str) -> Result<bool, DomainError> {
        let result = sqlx::query("UPDATE api_keys SET status = 'inactive' WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to deactivate API key: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_api_key(row: &sqlx::postgres::PgRow) -> Result<ApiKey, DomainError> {
    let token: String = row.get("token");
    let template_id: String = row.get("template_id");
    let limit_count: i32 = row.get("limit_count");
    let used_count: i32 = row.get("used_count");
    let status: String = row.get("status");
    let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");

    let template_id = TemplateId::new(&template_id)
        .map_err(|e| DomainError::storage(format!("Invalid template ID in database: {}", e)))?;

    let status = ApiKeyStatus::parse(&status).ok_or_else(|| {
        DomainError::storage(format!("Invalid API key status in database: '{}'", status))
    })?;

    Ok(ApiKey::from_record(
        token,
        template_id,
        limit_count as u32,
        used_count as u32,
        status,
        created_at,
    ))
}
