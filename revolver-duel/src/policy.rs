use crate::session::Session;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Where the active side points the revolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ShootSelf,
    ShootOpponent,
}

impl Action {
    pub fn shoots_self(self) -> bool {
        self == Self::ShootSelf
    }

    fn self_if(shoot_self: bool) -> Self {
        if shoot_self {
            Self::ShootSelf
        } else {
            Self::ShootOpponent
        }
    }
}

/// Decision logic for the house side of the duel.
pub trait OpponentStrategy: Send + Sync {
    fn decide(&self, session: &Session, rng: &mut dyn RngCore) -> Action;
}

/// The house opponent. Takes free self-shots while the cylinder looks safe,
/// presses a lead and gambles when behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicOpponent;

impl HeuristicOpponent {
    /// Bullet odds the opponent accepts for a self-shot; loosens each round.
    pub fn safe_threshold(round: u32) -> f64 {
        0.25 + 0.1 * f64::from(round)
    }
}

impl OpponentStrategy for HeuristicOpponent {
    fn decide(&self, session: &Session, rng: &mut dyn RngCore) -> Action {
        let bullet_chance = session.revolver().bullet_chance();
        let player_lives = i64::from(session.player_lives());
        let life_advantage = i64::from(session.opponent_lives()) - player_lives;
        let mut chance = |p: f64| rng.gen::<f64>() < p;

        let shoot_self = if bullet_chance <= Self::safe_threshold(session.round()) {
            life_advantage >= 0 || chance(0.7)
        } else if player_lives == 1 || life_advantage > 1 {
            false
        } else if life_advantage < -1 {
            bullet_chance < 0.5 || chance(0.4)
        } else if bullet_chance < 0.35 {
            chance(0.6)
        } else {
            chance(0.3)
        };

        Action::self_if(shoot_self)
    }
}

/// Always takes the same action. Pins the house side down in tests.
#[cfg(test)]
pub(crate) struct FixedOpponent(pub Action);

#[cfg(test)]
impl OpponentStrategy for FixedOpponent {
    fn decide(&self, _session: &Session, _rng: &mut dyn RngCore) -> Action {
        self.0
    }
}
