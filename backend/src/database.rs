//! Database Layer
//!
//! Read-only access to the asset-enablement table. The price service consults
//! it to narrow requested symbols to currently tradable assets.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};
use tracing::{debug, info};

use crate::error::{PriceError, Result};

/// Row of the enablement query.
#[derive(Debug, Clone, FromRow)]
pub struct EnabledAsset {
    pub asset_symbol: String,
}

/// Source of the currently enabled asset symbols.
#[async_trait]
pub trait AssetDirectory: Send + Sync {
    async fn enabled_assets(&self) -> Result<Vec<EnabledAsset>>;
}

/// Postgres-backed asset directory
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database client
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(PriceError::from)?;

        info!("Database connected successfully");

        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[async_trait]
impl AssetDirectory for Database {
    async fn enabled_assets(&self) -> Result<Vec<EnabledAsset>> {
        let rows = sqlx::query_as::<_, EnabledAsset>(
            r#"
            SELECT asset_symbol
            FROM assets
            WHERE is_enabled = TRUE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Loaded {} enabled assets", rows.len());
        Ok(rows)
    }
}

/// Fixed asset list, for deployments without a database.
pub struct StaticAssetDirectory {
    symbols: Vec<String>,
}

impl StaticAssetDirectory {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl AssetDirectory for StaticAssetDirectory {
    async fn enabled_assets(&self) -> Result<Vec<EnabledAsset>> {
        Ok(self
            .symbols
            .iter()
            .map(|s| EnabledAsset {
                asset_symbol: s.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_directory_lists_symbols() {
        let directory = StaticAssetDirectory::new(["BTC", "ETH"]);
        let assets = directory.enabled_assets().await.unwrap();
        let symbols: Vec<_> = assets.into_iter().map(|a| a.asset_symbol).collect();
        assert_eq!(symbols, vec!["BTC", "ETH"]);
    }

    // Requires a running Postgres with an `assets` table
    // Run with: DATABASE_URL=... cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_enabled_assets_query() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let db = Database::new(&url).await.unwrap();
        assert!(db.health_check().await);
        db.enabled_assets().await.unwrap();
    }
}
