use crate::policy::Action;
use crate::session::Side;
use crate::settlement::MatchOutcome;
use crate::shot::ShotOutcome;
use revolver_ledger::PlayerId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub player: u32,
    pub opponent: u32,
}

/// State transitions reported to the presentation layer, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DuelEvent {
    MatchStarted {
        bet: i64,
        max_rounds: u32,
    },
    RoundStarted {
        round: u32,
        lives: u32,
    },
    RevolverPrepared {
        round: u32,
        chambers: usize,
        bullets: usize,
        /// Hex SHA-256 commitment to the hidden layout.
        commitment: String,
        reloaded: bool,
    },
    TurnPrompt {
        actor: Side,
        /// Zero-based chamber about to be fired.
        chamber: usize,
        chambers: usize,
        player_lives: u32,
        opponent_lives: u32,
    },
    OpponentDecision {
        action: Action,
        bullet_chance: f64,
    },
    Shot(ShotOutcome),
    RevolverRevealed {
        round: u32,
        layout: Vec<bool>,
        nonce: String,
    },
    RoundEnded {
        round: u32,
        winner: Side,
        scoreboard: Scoreboard,
    },
    MatchEnded {
        /// None on a draw.
        winner: Option<Side>,
        outcome: MatchOutcome,
        /// Signed balance change; negative on a loss.
        payout: i64,
    },
}

/// Event published on the engine's broadcast channel.
#[derive(Debug, Clone)]
pub struct DuelNotice {
    pub player_id: PlayerId,
    pub event: DuelEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_are_tagged() {
        let event = DuelEvent::RoundStarted { round: 2, lives: 3 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "round_started");
        assert_eq!(json["round"], 2);

        let event = DuelEvent::OpponentDecision {
            action: Action::ShootSelf,
            bullet_chance: 0.25,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "shoot_self");
    }
}
