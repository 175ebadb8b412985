use crate::error::{LedgerError, Result};
use crate::ledger::{check_transfer, Ledger, LedgerConfig};
use crate::storage::{AccountStore, EntryStore, Storage};
use crate::types::{EntryReason, LedgerEntry, PlayerId};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// SQLite-backed ledger living in the data directory.
pub struct SqliteLedger {
    storage: Arc<Storage>,
    config: LedgerConfig,
}

impl SqliteLedger {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::with_config(data_dir, LedgerConfig::default()).await
    }

    pub async fn with_config(data_dir: &Path, config: LedgerConfig) -> Result<Self> {
        config.validate()?;

        let db_path = data_dir.join(&config.db_file);
        let storage = Arc::new(Storage::new(&db_path).await?);

        tracing::debug!("Opened ledger at {}", db_path.display());
        Ok(Self { storage, config })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// All known accounts, richest first.
    pub async fn accounts(&self) -> Result<Vec<(PlayerId, i64)>> {
        let conn = self.storage.get_connection().await;
        let accounts = AccountStore::new(&conn).list()?;
        Ok(accounts
            .into_iter()
            .map(|a| (a.player_id, a.balance))
            .collect())
    }

    fn apply(
        &self,
        conn: &Connection,
        player_id: PlayerId,
        delta: i64,
        reason: EntryReason,
    ) -> Result<i64> {
        let accounts = AccountStore::new(conn);
        let account = accounts.load_or_open(player_id, self.config.starting_balance)?;

        let balance_after = account
            .balance
            .checked_add(delta)
            .ok_or(LedgerError::InvalidAmount(delta))?;
        accounts.set_balance(player_id, balance_after)?;

        EntryStore::new(conn).append(&LedgerEntry {
            id: Uuid::new_v4(),
            player_id,
            delta,
            balance_after,
            reason,
            timestamp: Utc::now(),
        })?;

        Ok(balance_after)
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn balance(&self, player_id: PlayerId) -> Result<i64> {
        let conn = self.storage.get_connection().await;
        let account = AccountStore::new(&conn).load_or_open(player_id, self.config.starting_balance)?;
        Ok(account.balance)
    }

    async fn adjust_balance(
        &self,
        player_id: PlayerId,
        delta: i64,
        reason: EntryReason,
    ) -> Result<i64> {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;
        let balance_after = self.apply(&tx, player_id, delta, reason)?;
        tx.commit()?;

        tracing::info!(
            "Ledger {}: {:+} for {} (balance {})",
            reason,
            delta,
            player_id,
            balance_after
        );
        Ok(balance_after)
    }

    async fn history(&self, player_id: PlayerId) -> Result<Vec<LedgerEntry>> {
        let conn = self.storage.get_connection().await;
        EntryStore::new(&conn).history(player_id, self.config.history_limit)
    }

    async fn transfer(&self, from: PlayerId, to: PlayerId, amount: i64) -> Result<(i64, i64)> {
        check_transfer(from, to, amount)?;

        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;

        let available = AccountStore::new(&tx)
            .load_or_open(from, self.config.starting_balance)?
            .balance;
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                need: amount,
                available,
            });
        }

        let from_after = self.apply(&tx, from, -amount, EntryReason::Transfer)?;
        let to_after = self.apply(&tx, to, amount, EntryReason::Transfer)?;
        tx.commit()?;

        tracing::info!("Transferred {} from {} to {}", amount, from, to);
        Ok((from_after, to_after))
    }
}
