use crate::config::DuelConfig;
use crate::error::Result;
use crate::events::DuelEvent;
use crate::registry::SessionRegistry;
use crate::session::{Phase, Session, Side};
use revolver_ledger::{EntryReason, Ledger, PlayerId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    PlayerWon,
    OpponentWon,
    Draw,
    Surrendered,
    /// The player let a prompt time out.
    Forfeited,
}

impl MatchOutcome {
    pub fn winner(self) -> Option<Side> {
        match self {
            Self::PlayerWon => Some(Side::Player),
            Self::OpponentWon | Self::Surrendered | Self::Forfeited => Some(Side::Opponent),
            Self::Draw => None,
        }
    }

    /// Journal reason for the balance change; a draw moves no money.
    pub fn reason(self) -> Option<EntryReason> {
        match self {
            Self::PlayerWon => Some(EntryReason::DuelWin),
            Self::OpponentWon => Some(EntryReason::DuelLoss),
            Self::Surrendered => Some(EntryReason::Surrender),
            Self::Forfeited => Some(EntryReason::Forfeit),
            Self::Draw => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub player_id: PlayerId,
    pub session_id: Uuid,
    pub outcome: MatchOutcome,
    pub bet: i64,
    /// Signed change applied to the balance.
    pub payout: i64,
    pub balance_after: i64,
    pub player_round_wins: u32,
    pub opponent_round_wins: u32,
}

impl SettlementResult {
    pub fn to_event(&self) -> DuelEvent {
        DuelEvent::MatchEnded {
            winner: self.outcome.winner(),
            outcome: self.outcome,
            payout: self.payout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettlementEngine {
    win_multiplier: i64,
    surrender_divisor: i64,
}

impl SettlementEngine {
    pub fn new(win_multiplier: i64, surrender_divisor: i64) -> Self {
        Self {
            win_multiplier,
            surrender_divisor: surrender_divisor.max(1),
        }
    }

    pub fn from_config(config: &DuelConfig) -> Self {
        Self::new(config.win_multiplier, config.surrender_divisor)
    }

    pub fn payout(&self, outcome: MatchOutcome, bet: i64) -> i64 {
        match outcome {
            MatchOutcome::PlayerWon => bet.saturating_mul(self.win_multiplier),
            MatchOutcome::OpponentWon => -bet,
            MatchOutcome::Draw => 0,
            MatchOutcome::Surrendered | MatchOutcome::Forfeited => -(bet / self.surrender_divisor),
        }
    }

    /// Result of a completed match, from the round-win tally alone.
    pub fn outcome_of(session: &Session) -> MatchOutcome {
        match session
            .player_round_wins
            .cmp(&session.opponent_round_wins)
        {
            Ordering::Greater => MatchOutcome::PlayerWon,
            Ordering::Less => MatchOutcome::OpponentWon,
            Ordering::Equal => MatchOutcome::Draw,
        }
    }

    /// Apply the outcome to the ledger and retire the session. The session
    /// leaves the registry even when the ledger call fails.
    pub(crate) async fn settle(
        &self,
        ledger: &dyn Ledger,
        registry: &SessionRegistry,
        session: &mut Session,
        outcome: MatchOutcome,
    ) -> Result<SettlementResult> {
        let payout = self.payout(outcome, session.bet);
        let applied = match outcome.reason() {
            Some(reason) if payout != 0 => {
                ledger
                    .adjust_balance(session.player_id, payout, reason)
                    .await
            }
            _ => ledger.balance(session.player_id).await,
        };

        session.phase = Phase::Complete;
        session.awaiting_player_choice = false;
        session.choice_deadline = None;
        registry.remove(session.player_id);

        let balance_after = match applied {
            Ok(balance) => balance,
            Err(e) => {
                tracing::error!(
                    "Failed to settle duel {} for player {}: {}",
                    session.id,
                    session.player_id,
                    e
                );
                return Err(e.into());
            }
        };

        tracing::info!(
            "Duel {} settled for player {}: {:?}, payout {}, balance {}",
            session.id,
            session.player_id,
            outcome,
            payout,
            balance_after
        );

        Ok(SettlementResult {
            player_id: session.player_id,
            session_id: session.id,
            outcome,
            bet: session.bet,
            payout,
            balance_after,
            player_round_wins: session.player_round_wins,
            opponent_round_wins: session.opponent_round_wins,
        })
    }
}

impl Default for SettlementEngine {
    fn default() -> Self {
        Self::from_config(&DuelConfig::default())
    }
}
