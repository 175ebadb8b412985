use crate::policy::Action;
use crate::session::{Session, Side};
use serde::{Deserialize, Serialize};

/// Result of a single trigger pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotOutcome {
    pub round: u32,
    /// Zero-based chamber that was fired.
    pub chamber: usize,
    pub actor: Side,
    pub target: Side,
    pub loaded: bool,
    pub player_lives: u32,
    pub opponent_lives: u32,
    pub next_turn: Side,
    pub round_winner: Option<Side>,
}

impl ShotOutcome {
    /// The actor fired at themself on an empty chamber and keeps the turn.
    pub fn bonus_turn(&self) -> bool {
        !self.loaded && self.actor == self.target
    }
}

pub struct ShotResolver;

impl ShotResolver {
    /// Fire the current chamber and apply the result to the session.
    pub fn resolve(session: &mut Session, action: Action, actor: Side) -> ShotOutcome {
        let chamber = session.revolver.current_chamber();
        let target = if action.shoots_self() {
            actor
        } else {
            actor.other()
        };

        let loaded = session.revolver.fire();
        if loaded {
            session.lose_life(target);
        }

        session.turn = if !loaded && target == actor {
            actor
        } else {
            actor.other()
        };

        let outcome = ShotOutcome {
            round: session.round,
            chamber,
            actor,
            target,
            loaded,
            player_lives: session.player_lives,
            opponent_lives: session.opponent_lives,
            next_turn: session.turn,
            round_winner: session.round_winner(),
        };

        tracing::debug!(
            "Round {} chamber {}: {} shot {}, {}",
            outcome.round,
            chamber,
            actor,
            target,
            if loaded { "bang" } else { "click" }
        );

        outcome
    }
}
