//! Platform and asset protocol queries used by the SFTP backfill.

use sqlx::{QueryBuilder, Sqlite};

use super::db::{DatabaseError, TerminalDatabase};
use super::models::{AssetProtocol, Platform, PlatformProtocol};

/// Parameters for adding a protocol entry to a platform.
#[derive(Debug, Clone)]
pub struct NewPlatformProtocol {
    pub platform_id: i64,
    pub name: String,
    pub port: i64,
    pub is_primary: bool,
    pub required: bool,
    pub is_default: bool,
    pub public: bool,
    /// JSON object of per-protocol options.
    pub setting: String,
}

/// An `ssh` platform protocol together with its platform name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlatformSshProtocol {
    pub platform_id: i64,
    pub platform_name: String,
    pub port: i64,
    pub setting: String,
}

impl TerminalDatabase {
    // =========================================================================
    // Platform queries
    // =========================================================================

    pub async fn create_platform(
        &self,
        name: &str,
        platform_type: &str,
    ) -> Result<Platform, DatabaseError> {
        let result = sqlx::query("INSERT INTO platforms (name, platform_type) VALUES (?, ?)")
            .bind(name)
            .bind(platform_type)
            .execute(self.pool())
            .await?;

        sqlx::query_as::<_, Platform>("SELECT * FROM platforms WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(self.pool())
            .await
            .map_err(Into::into)
    }

    /// Insert platform protocols, ignoring `(platform, name)` conflicts.
    /// Returns how many rows were actually inserted.
    pub async fn insert_platform_protocols(
        &self,
        protocols: &[NewPlatformProtocol],
    ) -> Result<u64, DatabaseError> {
        let mut tx = self.pool().begin().await?;
        let mut inserted = 0;

        for p in protocols {
            let result = sqlx::query(
                r"
                INSERT INTO platform_protocols
                    (platform_id, name, port, is_primary, required, is_default, public, setting)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(platform_id, name) DO NOTHING
                ",
            )
            .bind(p.platform_id)
            .bind(&p.name)
            .bind(p.port)
            .bind(p.is_primary)
            .bind(p.required)
            .bind(p.is_default)
            .bind(p.public)
            .bind(&p.setting)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn platform_protocols(
        &self,
        platform_id: i64,
    ) -> Result<Vec<PlatformProtocol>, DatabaseError> {
        let protocols = sqlx::query_as::<_, PlatformProtocol>(
            "SELECT * FROM platform_protocols WHERE platform_id = ? ORDER BY id",
        )
        .bind(platform_id)
        .fetch_all(self.pool())
        .await?;

        Ok(protocols)
    }

    /// `ssh` protocols of linux platforms that have no `sftp` entry yet.
    ///
    /// Gateway and remote-app host platforms are excluded. The caller decides
    /// on the `sftp_enabled` setting.
    pub async fn linux_ssh_protocols_without_sftp(
        &self,
    ) -> Result<Vec<PlatformSshProtocol>, DatabaseError> {
        let rows = sqlx::query_as::<_, PlatformSshProtocol>(
            r"
            SELECT pp.platform_id, p.name AS platform_name, pp.port, pp.setting
            FROM platform_protocols pp
            JOIN platforms p ON p.id = pp.platform_id
            WHERE pp.name = 'ssh'
              AND p.platform_type = 'linux'
              AND p.name NOT IN ('Gateway', 'RemoteAppHost')
              AND NOT EXISTS (
                  SELECT 1 FROM platform_protocols s
                  WHERE s.platform_id = pp.platform_id AND s.name = 'sftp'
              )
            ORDER BY pp.id
            ",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    // =========================================================================
    // Asset queries
    // =========================================================================

    pub async fn create_asset(
        &self,
        id: &str,
        name: &str,
        platform_id: i64,
    ) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO assets (id, name, platform_id) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(platform_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Assets on an sftp-capable platform that lack an `sftp` protocol.
    pub async fn asset_ids_missing_sftp(&self) -> Result<Vec<String>, DatabaseError> {
        let ids = sqlx::query_scalar::<_, String>(
            r"
            SELECT DISTINCT a.id FROM assets a
            WHERE a.platform_id IN (
                SELECT platform_id FROM platform_protocols WHERE name = 'sftp'
            )
            AND NOT EXISTS (
                SELECT 1 FROM asset_protocols ap WHERE ap.asset_id = a.id AND ap.name = 'sftp'
            )
            ORDER BY a.id
            ",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(ids)
    }

    /// The `ssh` protocol entries of the given assets.
    pub async fn asset_ssh_protocols(
        &self,
        asset_ids: &[String],
    ) -> Result<Vec<AssetProtocol>, DatabaseError> {
        if asset_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT * FROM asset_protocols WHERE name = 'ssh' AND asset_id IN (");
        let mut separated = builder.separated(", ");
        for id in asset_ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(") ORDER BY id");

        let protocols = builder
            .build_query_as::<AssetProtocol>()
            .fetch_all(self.pool())
            .await?;

        Ok(protocols)
    }

    /// Add a protocol to an asset; `false` if the asset already has one by
    /// that name.
    pub async fn add_asset_protocol(
        &self,
        asset_id: &str,
        name: &str,
        port: i64,
    ) -> Result<bool, DatabaseError> {
        Ok(self
            .insert_asset_protocols(&[(asset_id.to_string(), name.to_string(), port)])
            .await?
            > 0)
    }

    /// Insert `(asset_id, name, port)` rows, ignoring `(asset, name)`
    /// conflicts. Returns how many rows were actually inserted.
    pub async fn insert_asset_protocols(
        &self,
        rows: &[(String, String, i64)],
    ) -> Result<u64, DatabaseError> {
        let mut tx = self.pool().begin().await?;
        let mut inserted = 0;

        for (asset_id, name, port) in rows {
            let result = sqlx::query(
                "INSERT INTO asset_protocols (asset_id, name, port) VALUES (?, ?, ?) ON CONFLICT(asset_id, name) DO NOTHING",
            )
            .bind(asset_id)
            .bind(name)
            .bind(port)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn asset_protocols(&self, asset_id: &str) -> Result<Vec<AssetProtocol>, DatabaseError> {
        let protocols = sqlx::query_as::<_, AssetProtocol>(
            "SELECT * FROM asset_protocols WHERE asset_id = ? ORDER BY name",
        )
        .bind(asset_id)
        .fetch_all(self.pool())
        .await?;

        Ok(protocols)
    }
}
