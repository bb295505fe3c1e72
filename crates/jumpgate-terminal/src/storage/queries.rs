//! Terminal, protocol catalog and domain queries.

use jumpgate_core::db::unix_timestamp;

use super::db::{DatabaseError, TerminalDatabase};
use super::models::{Domain, Protocol, Terminal};
use crate::protocol::{ProtocolName, TerminalType};

/// Parameters for registering a terminal.
#[derive(Debug, Clone)]
pub struct NewTerminal {
    pub name: String,
    pub terminal_type: TerminalType,
    pub remote_addr: String,
    pub ssh_port: u16,
    pub http_port: u16,
    pub command_storage: String,
    pub replay_storage: String,
    pub comment: String,
}

impl NewTerminal {
    /// A terminal with the stock ports and `default` storage backends.
    pub fn new(name: impl Into<String>, terminal_type: TerminalType) -> Self {
        Self {
            name: name.into(),
            terminal_type,
            remote_addr: String::new(),
            ssh_port: 2222,
            http_port: 5000,
            command_storage: "default".to_string(),
            replay_storage: "default".to_string(),
            comment: String::new(),
        }
    }
}

const INSERT_TERMINAL_SQL: &str = r"
    INSERT INTO terminals
        (id, name, terminal_type, remote_addr, ssh_port, http_port,
         command_storage, replay_storage, account_id, comment, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

const ACTIVE_TERMINALS_SQL: &str = r"
    SELECT t.* FROM terminals t
    JOIN accounts a ON a.id = t.account_id
    WHERE t.is_deleted = 0 AND a.is_active = 1
    ORDER BY t.is_accepted, t.created_at
";

impl TerminalDatabase {
    // =========================================================================
    // Terminal queries
    // =========================================================================

    /// Insert a terminal, optionally creating its service account in the
    /// same transaction.
    pub async fn create_terminal(
        &self,
        id: &str,
        params: &NewTerminal,
        account: Option<(&str, &str)>,
    ) -> Result<Terminal, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        if let Some((account_id, username)) = account {
            sqlx::query("INSERT INTO accounts (id, username, created_at) VALUES (?, ?, ?)")
                .bind(account_id)
                .bind(username)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(INSERT_TERMINAL_SQL)
            .bind(id)
            .bind(&params.name)
            .bind(params.terminal_type.as_str())
            .bind(&params.remote_addr)
            .bind(i64::from(params.ssh_port))
            .bind(i64::from(params.http_port))
            .bind(&params.command_storage)
            .bind(&params.replay_storage)
            .bind(account.map(|(account_id, _)| account_id))
            .bind(&params.comment)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_terminal(id).await
    }

    /// Get a terminal by ID.
    pub async fn get_terminal(&self, id: &str) -> Result<Terminal, DatabaseError> {
        sqlx::query_as::<_, Terminal>("SELECT * FROM terminals WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Terminal {id}")))
    }

    /// All terminals, unaccepted ones first.
    pub async fn list_terminals(&self) -> Result<Vec<Terminal>, DatabaseError> {
        let terminals = sqlx::query_as::<_, Terminal>(
            "SELECT * FROM terminals ORDER BY is_accepted, created_at",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(terminals)
    }

    /// Terminals that have not been soft-deleted.
    pub async fn list_undeleted_terminals(&self) -> Result<Vec<Terminal>, DatabaseError> {
        let terminals = sqlx::query_as::<_, Terminal>(
            "SELECT * FROM terminals WHERE is_deleted = 0 ORDER BY is_accepted, created_at",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(terminals)
    }

    /// Undeleted terminals whose service account is enabled.
    pub async fn list_active_terminals(&self) -> Result<Vec<Terminal>, DatabaseError> {
        let terminals = sqlx::query_as::<_, Terminal>(ACTIVE_TERMINALS_SQL)
            .fetch_all(self.pool())
            .await?;

        Ok(terminals)
    }

    pub async fn set_terminal_accepted(&self, id: &str, accepted: bool) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE terminals SET is_accepted = ? WHERE id = ?")
            .bind(accepted)
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Terminal {id}")));
        }
        Ok(())
    }

    /// Point a terminal at different storage backends.
    pub async fn update_terminal_storage(
        &self,
        id: &str,
        command_storage: &str,
        replay_storage: &str,
    ) -> Result<(), DatabaseError> {
        let result =
            sqlx::query("UPDATE terminals SET command_storage = ?, replay_storage = ? WHERE id = ?")
                .bind(command_storage)
                .bind(replay_storage)
                .bind(id)
                .execute(self.pool())
                .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Terminal {id}")));
        }
        Ok(())
    }

    /// Soft-delete a terminal and delete its service account as one unit.
    ///
    /// The account link is cleared before the account row is removed; if the
    /// account deletion fails the transaction is dropped and nothing changes.
    /// Returns the ID of the deleted account, if there was one.
    pub async fn soft_delete_terminal(&self, id: &str) -> Result<Option<String>, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let account_id: Option<String> =
            sqlx::query_scalar("SELECT account_id FROM terminals WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| DatabaseError::NotFound(format!("Terminal {id}")))?;

        sqlx::query("UPDATE terminals SET account_id = NULL, is_deleted = 1 WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if let Some(account_id) = &account_id {
            sqlx::query("DELETE FROM accounts WHERE id = ?")
                .bind(account_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(account_id)
    }

    // =========================================================================
    // Protocol catalog queries
    // =========================================================================

    /// Fetch the builtin `(name, port)` protocol, creating it if absent.
    ///
    /// Concurrent inserts of the same pair are resolved by the unique
    /// constraint: the losing insert is ignored and the winner's row returned.
    pub async fn get_or_create_protocol(
        &self,
        name: ProtocolName,
        port: u16,
    ) -> Result<Protocol, DatabaseError> {
        sqlx::query(
            "INSERT INTO protocols (name, port, builtin) VALUES (?, ?, 1) ON CONFLICT(name, port) DO NOTHING",
        )
        .bind(name.as_str())
        .bind(i64::from(port))
        .execute(self.pool())
        .await?;

        sqlx::query_as::<_, Protocol>("SELECT * FROM protocols WHERE name = ? AND port = ?")
            .bind(name.as_str())
            .bind(i64::from(port))
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Protocol {name}/{port}")))
    }

    /// The whole catalog ordered by name.
    pub async fn list_protocols(&self) -> Result<Vec<Protocol>, DatabaseError> {
        let protocols =
            sqlx::query_as::<_, Protocol>("SELECT * FROM protocols ORDER BY name, port")
                .fetch_all(self.pool())
                .await?;

        Ok(protocols)
    }

    /// Replace a terminal's protocol set wholesale.
    pub async fn replace_terminal_protocols(
        &self,
        terminal_id: &str,
        protocol_ids: &[i64],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM terminal_protocols WHERE terminal_id = ?")
            .bind(terminal_id)
            .execute(&mut *tx)
            .await?;

        for protocol_id in protocol_ids {
            sqlx::query(
                "INSERT INTO terminal_protocols (terminal_id, protocol_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
            )
            .bind(terminal_id)
            .bind(protocol_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Protocols a terminal currently serves.
    pub async fn terminal_protocols(&self, terminal_id: &str) -> Result<Vec<Protocol>, DatabaseError> {
        let protocols = sqlx::query_as::<_, Protocol>(
            r"
            SELECT p.* FROM protocols p
            JOIN terminal_protocols tp ON tp.protocol_id = p.id
            WHERE tp.terminal_id = ?
            ORDER BY p.name, p.port
            ",
        )
        .bind(terminal_id)
        .fetch_all(self.pool())
        .await?;

        Ok(protocols)
    }

    // =========================================================================
    // Domain queries
    // =========================================================================

    pub async fn create_domain(&self, id: &str, name: &str) -> Result<Domain, DatabaseError> {
        sqlx::query("INSERT INTO domains (id, name, created_at) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(unix_timestamp())
            .execute(self.pool())
            .await?;

        sqlx::query_as::<_, Domain>("SELECT * FROM domains WHERE id = ?")
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(Into::into)
    }

    /// Replace the set of network domains a terminal can reach.
    pub async fn replace_terminal_domains(
        &self,
        terminal_id: &str,
        domain_ids: &[String],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM terminal_domains WHERE terminal_id = ?")
            .bind(terminal_id)
            .execute(&mut *tx)
            .await?;

        for domain_id in domain_ids {
            sqlx::query(
                "INSERT INTO terminal_domains (terminal_id, domain_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
            )
            .bind(terminal_id)
            .bind(domain_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn terminal_domains(&self, terminal_id: &str) -> Result<Vec<Domain>, DatabaseError> {
        let domains = sqlx::query_as::<_, Domain>(
            r"
            SELECT d.* FROM domains d
            JOIN terminal_domains td ON td.domain_id = d.id
            WHERE td.terminal_id = ?
            ORDER BY d.name
            ",
        )
        .bind(terminal_id)
        .fetch_all(self.pool())
        .await?;

        Ok(domains)
    }
}
