//! Revolver ledger - account balances for the chat economy
//!
//! Every balance change made by the game is journaled with a reason, so a
//! player's history can always be reconciled against their balance.

pub mod error;
pub mod ledger;
pub mod storage;
pub mod types;

pub use error::{LedgerError, Result};
pub use ledger::{Ledger, LedgerConfig, MemoryLedger, SqliteLedger};
pub use types::{EntryReason, LedgerEntry, PlayerId};
