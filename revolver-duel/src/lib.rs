//! Revolver duel engine
//!
//! A player bets against a house opponent over a fixed number of rounds.
//! Each round loads a fresh cylinder; the sides take turns pointing it at
//! themselves or each other until someone runs out of lives. The engine
//! never waits on the player: it stops at each prompt and resumes on the
//! next command.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod policy;
pub mod registry;
pub mod revolver;
pub mod round;
pub mod session;
pub mod settlement;
pub mod shot;

pub use config::DuelConfig;
pub use engine::{DuelEngine, ShotReport, StartReport};
pub use error::{DuelError, Result};
pub use events::{DuelEvent, DuelNotice, Scoreboard};
pub use policy::{Action, HeuristicOpponent, OpponentStrategy};
pub use registry::SessionRegistry;
pub use revolver::{LayoutCommitment, Revolver, RevolverFactory};
pub use round::{Progress, RoundController};
pub use session::{ChannelId, Phase, Session, Side};
pub use settlement::{MatchOutcome, SettlementEngine, SettlementResult};
pub use shot::{ShotOutcome, ShotResolver};

use revolver_ledger::SqliteLedger;
use std::path::Path;
use std::sync::Arc;

/// Engine backed by the SQLite ledger in `data_dir`.
pub async fn open_engine(data_dir: &Path, config: DuelConfig) -> Result<DuelEngine> {
    let ledger = SqliteLedger::new(data_dir).await?;
    DuelEngine::new(config, Arc::new(ledger))
}
