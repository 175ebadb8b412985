use crate::error::Result;
use crate::storage::{player_from_sql, sql_id};
use crate::types::PlayerId;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountData {
    pub player_id: PlayerId,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

/// Row access for the `accounts` table. Borrowing a connection (or an open
/// transaction) lets callers group several statements atomically.
pub struct AccountStore<'a> {
    conn: &'a Connection,
}

impl<'a> AccountStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn load(&self, player_id: PlayerId) -> Result<Option<AccountData>> {
        let account = self
            .conn
            .query_row(
                "SELECT player_id, balance, created_at FROM accounts WHERE player_id = ?1",
                params![sql_id(player_id)],
                |row| {
                    Ok(AccountData {
                        player_id: player_from_sql(row.get(0)?),
                        balance: row.get(1)?,
                        created_at: DateTime::from_timestamp(row.get(2)?, 0)
                            .unwrap_or_else(Utc::now),
                    })
                },
            )
            .optional()?;

        Ok(account)
    }

    /// Load the account, opening it with `starting_balance` if it is new.
    pub fn load_or_open(&self, player_id: PlayerId, starting_balance: i64) -> Result<AccountData> {
        if let Some(account) = self.load(player_id)? {
            return Ok(account);
        }

        let account = AccountData {
            player_id,
            balance: starting_balance,
            created_at: Utc::now(),
        };

        self.conn.execute(
            "INSERT INTO accounts (player_id, balance, created_at) VALUES (?1, ?2, ?3)",
            params![
                sql_id(player_id),
                account.balance,
                account.created_at.timestamp()
            ],
        )?;

        tracing::debug!(
            "Opened account {} with balance {}",
            player_id,
            starting_balance
        );
        Ok(account)
    }

    pub fn set_balance(&self, player_id: PlayerId, balance: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE accounts SET balance = ?1 WHERE player_id = ?2",
            params![balance, sql_id(player_id)],
        )?;
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<AccountData>> {
        let mut stmt = self.conn.prepare(
            "SELECT player_id, balance, created_at FROM accounts ORDER BY balance DESC",
        )?;

        let account_iter = stmt.query_map([], |row| {
            Ok(AccountData {
                player_id: player_from_sql(row.get(0)?),
                balance: row.get(1)?,
                created_at: DateTime::from_timestamp(row.get(2)?, 0).unwrap_or_else(Utc::now),
            })
        })?;

        let mut accounts = Vec::new();
        for account in account_iter {
            accounts.push(account?);
        }

        Ok(accounts)
    }
}
