//! Database layer for TenderDesk
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection pool management
//! - Schema creation from the entity definitions

pub mod models;
mod repository;

pub use repository::{is_unique_violation, NewDocument, NewTender, Repository, TenderStats};

#[cfg(test)]
pub(crate) use repository::fixtures;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use models::{AnalyticsMetricEntity, DocumentEntity, TenderEntity, UserEntity};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(cfg!(debug_assertions));

        Self::connect(opts).await
    }

    /// Private in-memory SQLite database, used by tests and local experiments
    pub async fn in_memory() -> Result<Self> {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        Self::connect(opts).await
    }

    async fn connect(opts: ConnectOptions) -> Result<Self> {
        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        let pool = Self { conn };
        pool.create_schema().await?;

        info!("Database connection established");

        Ok(pool)
    }

    /// Create any missing tables
    async fn create_schema(&self) -> Result<()> {
        self.create_table(UserEntity).await?;
        self.create_table(TenderEntity).await?;
        self.create_table(DocumentEntity).await?;
        self.create_table(AnalyticsMetricEntity).await?;
        Ok(())
    }

    async fn create_table<E: EntityTrait>(&self, entity: E) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);
        let stmt = schema
            .create_table_from_entity(entity)
            .if_not_exists()
            .to_owned();

        self.conn.execute(backend.build(&stmt)).await?;
        Ok(())
    }

    /// Connection used for all statements
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }
}
