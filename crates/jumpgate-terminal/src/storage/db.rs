//! SQLite database for the terminal registry.

use std::path::Path;

use sqlx::{Pool, Sqlite};
use tracing::info;

use jumpgate_core::config::DatabaseConfig;
pub use jumpgate_core::db::DatabaseError;

#[derive(Clone)]
pub struct TerminalDatabase {
    pool: Pool<Sqlite>,
}

impl TerminalDatabase {
    /// Open or create the registry database at `path` and apply migrations.
    pub async fn open(path: &Path, config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = jumpgate_core::db::open_pool(path, config).await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        let pool = jumpgate_core::db::open_pool_in_memory().await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        info!("Terminal registry migrations complete");
        Ok(())
    }

    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}
