use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Chat-platform user id. Opaque to the ledger.
pub type PlayerId = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub player_id: PlayerId,
    pub delta: i64, // +ve credit, -ve debit
    pub balance_after: i64,
    pub reason: EntryReason,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryReason {
    Deposit,
    DuelWin,
    DuelLoss,
    Surrender,
    Forfeit,
    Transfer,
}

impl EntryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::DuelWin => "duel_win",
            Self::DuelLoss => "duel_loss",
            Self::Surrender => "surrender",
            Self::Forfeit => "forfeit",
            Self::Transfer => "transfer",
        }
    }
}

impl fmt::Display for EntryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryReason {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "duel_win" => Ok(Self::DuelWin),
            "duel_loss" => Ok(Self::DuelLoss),
            "surrender" => Ok(Self::Surrender),
            "forfeit" => Ok(Self::Forfeit),
            "transfer" => Ok(Self::Transfer),
            other => Err(format!("unknown entry reason '{}'", other)),
        }
    }
}
