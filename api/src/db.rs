//! Database connection module for `ClickHouse`.
//!
//! Builds the shared client from environment variables and creates the
//! item and alert-configuration tables at startup.

use anyhow::{Context, Result};
use clickhouse::Client;
use shared::alert::ClickHouseTargets;
use shared::storage::{ClickHouseStore, TableNames};
use std::sync::Arc;

/// Database configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `ClickHouse` database URL (e.g., <http://localhost:8123>)
    pub url: String,
    /// Database name to use
    pub database: String,
    /// Username for authentication
    pub user: String,
    /// Password for authentication
    pub password: String,
}

impl DatabaseConfig {
    /// Load database configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `EDGEWATCH_DB_URL`: Database URL (default: <http://localhost:8123>)
    /// - `EDGEWATCH_DB_NAME`: Database name (default: "edgewatch")
    /// - `EDGEWATCH_DB_USER`: Database user (default: "default")
    /// - `EDGEWATCH_DB_PASSWORD`: Database password (default: empty)
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("EDGEWATCH_DB_URL")
                .unwrap_or_else(|_| "http://localhost:8123".to_string()),
            database: std::env::var("EDGEWATCH_DB_NAME")
                .unwrap_or_else(|_| "edgewatch".to_string()),
            user: std::env::var("EDGEWATCH_DB_USER").unwrap_or_else(|_| "default".to_string()),
            password: std::env::var("EDGEWATCH_DB_PASSWORD").unwrap_or_default(),
        }
    }
}

/// Database client wrapper.
#[derive(Clone)]
pub struct Database {
    client: Arc<Client>,
}

impl Database {
    /// Create a new database client from configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// # use api::db::{Database, DatabaseConfig};
    /// let config = DatabaseConfig::from_env();
    /// let db = Database::new(&config);
    /// ```
    #[must_use]
    pub fn new(config: &DatabaseConfig) -> Self {
        let client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database)
            .with_user(&config.user)
            .with_password(&config.password);

        Self {
            client: Arc::new(client),
        }
    }

    /// Get a reference to the underlying `ClickHouse` client.
    #[must_use]
    pub fn client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }

    /// Test database connectivity by executing a simple query.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached or the query fails.
    pub async fn ping(&self) -> Result<()> {
        self.client
            .query("SELECT 1")
            .fetch_one::<u8>()
            .await
            .context("Failed to ping database")?;
        Ok(())
    }

    /// Builds the item store and creates its tables.
    ///
    /// # Errors
    ///
    /// Returns an error if a table name is invalid or the DDL fails.
    pub async fn item_store(&self, tables: TableNames) -> Result<ClickHouseStore> {
        let store = ClickHouseStore::new(self.client(), tables).context("Invalid item tables")?;
        store
            .ensure_schema()
            .await
            .context("Failed to create item tables")?;
        Ok(store)
    }

    /// Builds the alert target lookup and creates its table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table name is invalid or the DDL fails.
    pub async fn alert_targets(&self, table: &str) -> Result<ClickHouseTargets> {
        let targets =
            ClickHouseTargets::new(self.client(), table).context("Invalid alert config table")?;
        targets
            .ensure_schema()
            .await
            .context("Failed to create alert config table")?;
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_with_custom_values() {
        let config = DatabaseConfig {
            url: "http://custom:8123".to_string(),
            database: "test_db".to_string(),
            user: "test_user".to_string(),
            password: "test_pass".to_string(),
        };

        assert_eq!(config.url, "http://custom:8123");
        assert_eq!(config.database, "test_db");
    }

    #[test]
    fn test_database_creation() {
        let config = DatabaseConfig {
            url: "http://localhost:8123".to_string(),
            database: "edgewatch".to_string(),
            user: "default".to_string(),
            password: String::new(),
        };

        let db = Database::new(&config);
        assert_eq!(Arc::strong_count(&db.client()), 2);
    }

    #[tokio::test]
    #[ignore = "requires a running ClickHouse instance"]
    async fn test_database_ping() {
        let db = Database::new(&DatabaseConfig::from_env());
        assert!(db.ping().await.is_ok());
    }
}
