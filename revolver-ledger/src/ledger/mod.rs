pub mod config;
pub mod memory;
pub mod sqlite;

pub use config::LedgerConfig;
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

use crate::error::{LedgerError, Result};
use crate::types::{EntryReason, LedgerEntry, PlayerId};
use async_trait::async_trait;

/// Account balances the game economy settles against.
///
/// Balances are plain signed integers. `adjust_balance` applies the delta as
/// given: settlement amounts are fixed by the game rules, so a debit may take
/// a balance below zero if the player spent funds elsewhere mid-match.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current balance, opening the account with the starting balance if new.
    async fn balance(&self, player_id: PlayerId) -> Result<i64>;

    /// Apply `delta` and journal it. Returns the balance after the change.
    async fn adjust_balance(
        &self,
        player_id: PlayerId,
        delta: i64,
        reason: EntryReason,
    ) -> Result<i64>;

    /// Journal for one player, most recent first.
    async fn history(&self, player_id: PlayerId) -> Result<Vec<LedgerEntry>>;

    /// Move `amount` from one account to another atomically. Unlike
    /// settlement, a transfer never overdraws the sender. Returns the
    /// balances of sender and receiver afterwards.
    async fn transfer(&self, from: PlayerId, to: PlayerId, amount: i64) -> Result<(i64, i64)>;
}

pub(crate) fn check_transfer(from: PlayerId, to: PlayerId, amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    if from == to {
        return Err(LedgerError::internal("Cannot transfer to the same account"));
    }
    Ok(())
}
