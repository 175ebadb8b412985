use crate::error::{LedgerError, Result};
use crate::ledger::{check_transfer, Ledger, LedgerConfig};
use crate::types::{EntryReason, LedgerEntry, PlayerId};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Books {
    balances: HashMap<PlayerId, i64>,
    entries: Vec<LedgerEntry>,
}

/// In-process ledger for tests and throwaway sessions.
pub struct MemoryLedger {
    config: LedgerConfig,
    books: RwLock<Books>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        Self {
            config,
            books: RwLock::new(Books::default()),
        }
    }

    /// Seed an account with an exact balance, bypassing the journal.
    pub fn set_balance(&self, player_id: PlayerId, balance: i64) {
        self.books.write().balances.insert(player_id, balance);
    }

    fn apply(
        &self,
        books: &mut Books,
        player_id: PlayerId,
        delta: i64,
        reason: EntryReason,
    ) -> Result<i64> {
        let balance = books
            .balances
            .entry(player_id)
            .or_insert(self.config.starting_balance);
        let balance_after = balance
            .checked_add(delta)
            .ok_or(LedgerError::InvalidAmount(delta))?;
        *balance = balance_after;

        books.entries.push(LedgerEntry {
            id: Uuid::new_v4(),
            player_id,
            delta,
            balance_after,
            reason,
            timestamp: Utc::now(),
        });

        Ok(balance_after)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn balance(&self, player_id: PlayerId) -> Result<i64> {
        if let Some(balance) = self.books.read().balances.get(&player_id) {
            return Ok(*balance);
        }

        let mut books = self.books.write();
        Ok(*books
            .balances
            .entry(player_id)
            .or_insert(self.config.starting_balance))
    }

    async fn adjust_balance(
        &self,
        player_id: PlayerId,
        delta: i64,
        reason: EntryReason,
    ) -> Result<i64> {
        let mut books = self.books.write();
        self.apply(&mut books, player_id, delta, reason)
    }

    async fn history(&self, player_id: PlayerId) -> Result<Vec<LedgerEntry>> {
        let books = self.books.read();
        Ok(books
            .entries
            .iter()
            .rev()
            .filter(|e| e.player_id == player_id)
            .take(self.config.history_limit)
            .cloned()
            .collect())
    }

    async fn transfer(&self, from: PlayerId, to: PlayerId, amount: i64) -> Result<(i64, i64)> {
        check_transfer(from, to, amount)?;

        let mut books = self.books.write();
        let available = *books
            .balances
            .get(&from)
            .unwrap_or(&self.config.starting_balance);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                need: amount,
                available,
            });
        }

        let from_after = self.apply(&mut books, from, -amount, EntryReason::Transfer)?;
        let to_after = self.apply(&mut books, to, amount, EntryReason::Transfer)?;
        Ok((from_after, to_after))
    }
}
