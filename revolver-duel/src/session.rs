use crate::revolver::Revolver;
use chrono::{DateTime, Utc};
use revolver_ledger::PlayerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Channel the duel was started from. Opaque to the engine.
pub type ChannelId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Player,
    Opponent,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Self::Player => Self::Opponent,
            Self::Opponent => Self::Player,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => f.write_str("player"),
            Self::Opponent => f.write_str("opponent"),
        }
    }
}

/// Position of a session in the round state machine. Persisted between
/// commands so a suspended duel resumes where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    RoundStart,
    TurnLoop,
    RoundEnd { winner: Side },
    Complete,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) id: Uuid,
    pub(crate) player_id: PlayerId,
    pub(crate) origin_channel: ChannelId,
    pub(crate) bet: i64,
    pub(crate) round: u32,
    pub(crate) max_rounds: u32,
    pub(crate) player_round_wins: u32,
    pub(crate) opponent_round_wins: u32,
    pub(crate) player_lives: u32,
    pub(crate) opponent_lives: u32,
    pub(crate) turn: Side,
    pub(crate) revolver: Revolver,
    pub(crate) awaiting_player_choice: bool,
    pub(crate) phase: Phase,
    pub(crate) prompt_seq: u64,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) choice_deadline: Option<DateTime<Utc>>,
}

impl Session {
    pub(crate) fn new(
        player_id: PlayerId,
        origin_channel: ChannelId,
        bet: i64,
        max_rounds: u32,
        lives: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            origin_channel,
            bet,
            round: 1,
            max_rounds,
            player_round_wins: 0,
            opponent_round_wins: 0,
            player_lives: lives,
            opponent_lives: lives,
            turn: Side::Player,
            revolver: Revolver::default(),
            awaiting_player_choice: false,
            phase: Phase::RoundStart,
            prompt_seq: 0,
            started_at: Utc::now(),
            choice_deadline: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn origin_channel(&self) -> ChannelId {
        self.origin_channel
    }

    pub fn bet(&self) -> i64 {
        self.bet
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn player_round_wins(&self) -> u32 {
        self.player_round_wins
    }

    pub fn opponent_round_wins(&self) -> u32 {
        self.opponent_round_wins
    }

    pub fn player_lives(&self) -> u32 {
        self.player_lives
    }

    pub fn opponent_lives(&self) -> u32 {
        self.opponent_lives
    }

    pub fn lives(&self, side: Side) -> u32 {
        match side {
            Side::Player => self.player_lives,
            Side::Opponent => self.opponent_lives,
        }
    }

    pub fn turn(&self) -> Side {
        self.turn
    }

    pub fn turn_is_player(&self) -> bool {
        self.turn == Side::Player
    }

    pub fn revolver(&self) -> &Revolver {
        &self.revolver
    }

    pub fn awaiting_player_choice(&self) -> bool {
        self.awaiting_player_choice
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn choice_deadline(&self) -> Option<DateTime<Utc>> {
        self.choice_deadline
    }

    /// Time left on the open prompt, zero once the deadline has passed.
    pub fn time_left(&self) -> Option<std::time::Duration> {
        let deadline = self.choice_deadline?;
        Some((deadline - Utc::now()).to_std().unwrap_or_default())
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    pub(crate) fn lose_life(&mut self, side: Side) {
        let lives = match side {
            Side::Player => &mut self.player_lives,
            Side::Opponent => &mut self.opponent_lives,
        };
        *lives = lives.saturating_sub(1);
    }

    /// Round winner once one side is out of lives.
    pub(crate) fn round_winner(&self) -> Option<Side> {
        if self.player_lives == 0 {
            Some(Side::Opponent)
        } else if self.opponent_lives == 0 {
            Some(Side::Player)
        } else {
            None
        }
    }

    /// Consume a pending player prompt. Test-and-clear: only one caller can
    /// win a given prompt.
    pub(crate) fn take_player_turn(&mut self) -> bool {
        if !self.awaiting_player_choice || self.turn != Side::Player || self.is_complete() {
            return false;
        }
        self.awaiting_player_choice = false;
        self.choice_deadline = None;
        true
    }

    /// Session mid-round with a fixed cylinder, the player to act.
    #[cfg(test)]
    pub(crate) fn fixture(layout: Vec<bool>) -> Self {
        let mut session = Self::new(1, 1, 100, 3, 3);
        session.revolver = Revolver::from_layout(layout);
        session.phase = Phase::TurnLoop;
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_at_round_one() {
        let session = Session::new(5, 9, 100, 3, 3);
        assert_eq!(session.round(), 1);
        assert_eq!(session.bet(), 100);
        assert_eq!(session.player_lives(), 3);
        assert_eq!(session.opponent_lives(), 3);
        assert_eq!(session.phase(), Phase::RoundStart);
        assert!(!session.awaiting_player_choice());
    }

    #[test]
    fn test_take_player_turn_only_once() {
        let mut session = Session::fixture(vec![false, true]);
        session.awaiting_player_choice = true;

        assert!(session.take_player_turn());
        assert!(!session.take_player_turn());

        session.awaiting_player_choice = true;
        session.turn = Side::Opponent;
        assert!(!session.take_player_turn());
    }

    #[test]
    fn test_time_left_counts_down_to_zero() {
        let mut session = Session::fixture(vec![false, true]);
        assert_eq!(session.time_left(), None);

        session.choice_deadline = Some(Utc::now() + chrono::Duration::seconds(30));
        let left = session.time_left().unwrap();
        assert!(left <= std::time::Duration::from_secs(30));
        assert!(left > std::time::Duration::from_secs(25));

        session.choice_deadline = Some(Utc::now() - chrono::Duration::seconds(5));
        assert_eq!(session.time_left(), Some(std::time::Duration::ZERO));
    }

    #[test]
    fn test_lives_never_go_negative() {
        let mut session = Session::fixture(vec![true, false]);
        for _ in 0..5 {
            session.lose_life(Side::Opponent);
        }
        assert_eq!(session.opponent_lives(), 0);
        assert_eq!(session.round_winner(), Some(Side::Player));
    }
}
