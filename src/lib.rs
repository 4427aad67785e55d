//! Docgen Gateway
//!
//! API-key accounting for a document-template service:
//! - Metered key issuance scoped to a template
//! - Quota enforcement with race-free usage counting
//! - Append-only usage ledger
//! - Fixed-window rate limiting per (key, client) pair
//!
//! The surrounding request-handling and admin layers call
//! [`AccountingService`](infrastructure::api_key::AccountingService); this
//! crate carries no transport of its own.

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use config::StorageBackend;
use infrastructure::api_key::{
    AccountingService, InMemoryApiKeyRepository, PostgresApiKeyRepository, PostgresConfig,
};
use infrastructure::usage::{InMemoryUsageLedger, PostgresUsageLedger};

/// Build the accounting service for the configured storage backend
pub async fn build_accounting_service(config: &AppConfig) -> anyhow::Result<AccountingService> {
    match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            Ok(AccountingService::new(
                Arc::new(InMemoryApiKeyRepository::new()),
                Arc::new(InMemoryUsageLedger::new()),
            ))
        }
        StorageBackend::Postgres => {
            let url = std::env::var("DATABASE_URL")
                .ok()
                .or_else(|| config.storage.database_url.clone())
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "postgres backend selected but neither DATABASE_URL nor \
                         storage.database_url is set"
                    )
                })?;

            info!("Connecting to PostgreSQL...");
            let pool = PostgresConfig::new(url)
                .with_max_connections(config.storage.max_connections)
                .connect()
                .await?;
            info!("PostgreSQL connection established");

            build_accounting_service_with_pool(pool).await
        }
    }
}

/// Build the accounting service on an existing PostgreSQL pool
pub async fn build_accounting_service_with_pool(
    pool: sqlx::PgPool,
) -> anyhow::Result<AccountingService> {
    let keys = PostgresApiKeyRepository::new(pool.clone());
    keys.ensure_schema().await?;

    let ledger = PostgresUsageLedger::new(pool);
    ledger.ensure_schema().await?;

    Ok(AccountingService::new(Arc::new(keys), Arc::new(ledger)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{RateLimitPolicy, TemplateId};

    #[tokio::test]
    async fn test_build_memory_backend() {
        let config = AppConfig::default();
        let service = build_accounting_service(&config).await.unwrap();

        let key = service
            .issue(TemplateId::new("invoice").unwrap(), 1)
            .await
            .unwrap();

        let redemption = service
            .redeem(key.token(), "client-a", &RateLimitPolicy::default())
            .await
            .unwrap();
        assert!(redemption.is_granted());
    }
}
