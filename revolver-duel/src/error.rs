use revolver_ledger::{LedgerError, PlayerId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DuelError>;

#[derive(Error, Debug)]
pub enum DuelError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Player {0} already has an active duel")]
    SessionAlreadyActive(PlayerId),

    #[error("No active duel for player {0}")]
    NoActiveSession(PlayerId),

    #[error("Not the player's turn")]
    NotPlayersTurn,

    #[error("Invalid bet: {0} (must be greater than 0)")]
    InvalidBet(i64),

    #[error("Insufficient funds: need {need}, have {available}")]
    InsufficientFunds { need: i64, available: i64 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DuelError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
