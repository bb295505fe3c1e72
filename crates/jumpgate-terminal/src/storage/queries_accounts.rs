//! Service account and session queries.

use jumpgate_core::db::unix_timestamp;

use super::db::{DatabaseError, TerminalDatabase};
use super::models::{Account, Session};

/// Tenant scope for session queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionScope {
    /// Sessions of a single organization.
    Org(String),
    /// Every organization; used by cross-tenant components like the registry.
    Root,
}

impl TerminalDatabase {
    // =========================================================================
    // Account queries
    // =========================================================================

    pub async fn create_account(&self, id: &str, username: &str) -> Result<Account, DatabaseError> {
        sqlx::query("INSERT INTO accounts (id, username, created_at) VALUES (?, ?, ?)")
            .bind(id)
            .bind(username)
            .bind(unix_timestamp())
            .execute(self.pool())
            .await?;

        self.get_account(id).await
    }

    pub async fn get_account(&self, id: &str) -> Result<Account, DatabaseError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Account {id}")))
    }

    /// Enable or disable an account.
    pub async fn set_account_active(&self, id: &str, active: bool) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE accounts SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Account {id}")));
        }
        Ok(())
    }

    // =========================================================================
    // Session queries
    // =========================================================================

    pub async fn create_session(
        &self,
        id: &str,
        terminal_id: &str,
        org_id: &str,
    ) -> Result<Session, DatabaseError> {
        sqlx::query("INSERT INTO sessions (id, terminal_id, org_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(terminal_id)
            .bind(org_id)
            .bind(unix_timestamp())
            .execute(self.pool())
            .await?;

        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(Into::into)
    }

    pub async fn finish_session(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE sessions SET is_finished = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count sessions on a terminal that have not finished yet.
    pub async fn count_open_sessions(
        &self,
        terminal_id: &str,
        scope: &SessionScope,
    ) -> Result<i64, DatabaseError> {
        let row: (i64,) = match scope {
            SessionScope::Org(org_id) => {
                sqlx::query_as(
                    "SELECT COUNT(*) FROM sessions WHERE terminal_id = ? AND is_finished = 0 AND org_id = ?",
                )
                .bind(terminal_id)
                .bind(org_id)
                .fetch_one(self.pool())
                .await?
            }
            SessionScope::Root => {
                sqlx::query_as(
                    "SELECT COUNT(*) FROM sessions WHERE terminal_id = ? AND is_finished = 0",
                )
                .bind(terminal_id)
                .fetch_one(self.pool())
                .await?
            }
        };

        Ok(row.0)
    }
}
