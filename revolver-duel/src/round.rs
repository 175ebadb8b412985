use crate::config::DuelConfig;
use crate::error::{DuelError, Result};
use crate::events::{DuelEvent, Scoreboard};
use crate::policy::{Action, OpponentStrategy};
use crate::revolver::RevolverFactory;
use crate::session::{Phase, Session, Side};
use crate::shot::{ShotOutcome, ShotResolver};
use chrono::Utc;
use rand::{Rng, RngCore};
use tracing::{debug, info};

/// Where control ended up after driving a session forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Suspended on a player prompt.
    AwaitingPlayer,
    /// All rounds played; the session is ready for settlement.
    MatchComplete,
}

/// Drives a session through `RoundStart -> TurnLoop -> RoundEnd` until the
/// player has to act or the match is over. Opponent turns run inline.
pub struct RoundController<'a> {
    config: &'a DuelConfig,
    factory: &'a RevolverFactory,
    strategy: &'a dyn OpponentStrategy,
    rng: &'a mut dyn RngCore,
    events: Vec<DuelEvent>,
}

impl<'a> RoundController<'a> {
    pub fn new(
        config: &'a DuelConfig,
        factory: &'a RevolverFactory,
        strategy: &'a dyn OpponentStrategy,
        rng: &'a mut dyn RngCore,
    ) -> Self {
        Self {
            config,
            factory,
            strategy,
            rng,
            events: Vec::new(),
        }
    }

    pub fn begin_match(&mut self, session: &mut Session) -> Progress {
        info!(
            "Duel {} started for player {} with bet {}",
            session.id, session.player_id, session.bet
        );
        self.events.push(DuelEvent::MatchStarted {
            bet: session.bet,
            max_rounds: session.max_rounds,
        });
        self.run(session)
    }

    /// Resolve the player's pending choice, then carry on until the next
    /// prompt or the end of the match.
    pub fn player_action(
        &mut self,
        session: &mut Session,
        action: Action,
    ) -> Result<(ShotOutcome, Progress)> {
        if !session.take_player_turn() {
            return Err(DuelError::NotPlayersTurn);
        }

        let outcome = ShotResolver::resolve(session, action, Side::Player);
        self.after_shot(session, &outcome);
        let progress = self.run(session);
        Ok((outcome, progress))
    }

    pub fn into_events(self) -> Vec<DuelEvent> {
        self.events
    }

    fn run(&mut self, session: &mut Session) -> Progress {
        loop {
            match session.phase {
                Phase::RoundStart => self.start_round(session),
                Phase::TurnLoop if session.turn == Side::Player => {
                    self.prompt_player(session);
                    return Progress::AwaitingPlayer;
                }
                Phase::TurnLoop => self.opponent_turn(session),
                Phase::RoundEnd { winner } => self.end_round(session, winner),
                Phase::Complete => return Progress::MatchComplete,
            }
        }
    }

    fn start_round(&mut self, session: &mut Session) {
        session.player_lives = self.config.lives_per_round;
        session.opponent_lives = self.config.lives_per_round;
        session.revolver = self.factory.build(session.round, &mut *self.rng);
        session.turn = if self.rng.gen::<bool>() {
            Side::Player
        } else {
            Side::Opponent
        };
        session.awaiting_player_choice = false;
        session.phase = Phase::TurnLoop;

        info!(
            "Duel {} round {}/{}: {} goes first",
            session.id, session.round, session.max_rounds, session.turn
        );

        self.events.push(DuelEvent::RoundStarted {
            round: session.round,
            lives: self.config.lives_per_round,
        });
        self.events.push(prepared_event(session, false));
    }

    fn prompt_player(&mut self, session: &mut Session) {
        session.awaiting_player_choice = true;
        session.prompt_seq += 1;
        session.choice_deadline = chrono::Duration::from_std(self.config.choice_timeout())
            .ok()
            .map(|timeout| Utc::now() + timeout);
        self.events.push(prompt_event(session));
    }

    fn opponent_turn(&mut self, session: &mut Session) {
        self.events.push(prompt_event(session));

        let bullet_chance = session.revolver.bullet_chance();
        let action = self.strategy.decide(session, &mut *self.rng);
        debug!(
            "Opponent chose {:?} at bullet chance {:.2}",
            action, bullet_chance
        );
        self.events.push(DuelEvent::OpponentDecision {
            action,
            bullet_chance,
        });

        let outcome = ShotResolver::resolve(session, action, Side::Opponent);
        self.after_shot(session, &outcome);
    }

    fn after_shot(&mut self, session: &mut Session, outcome: &ShotOutcome) {
        self.events.push(DuelEvent::Shot(outcome.clone()));

        if let Some(winner) = outcome.round_winner {
            session.phase = Phase::RoundEnd { winner };
        } else if session.revolver.is_spent() {
            // both sides still standing on an empty cylinder: reload
            self.events.push(reveal_event(session));
            session.revolver = self.factory.build(session.round, &mut *self.rng);
            info!(
                "Duel {} round {}: cylinder spent, reloaded",
                session.id, session.round
            );
            self.events.push(prepared_event(session, true));
        }
    }

    fn end_round(&mut self, session: &mut Session, winner: Side) {
        match winner {
            Side::Player => session.player_round_wins += 1,
            Side::Opponent => session.opponent_round_wins += 1,
        }

        info!(
            "Duel {} round {} won by {} ({}-{})",
            session.id,
            session.round,
            winner,
            session.player_round_wins,
            session.opponent_round_wins
        );

        self.events.push(reveal_event(session));
        self.events.push(DuelEvent::RoundEnded {
            round: session.round,
            winner,
            scoreboard: Scoreboard {
                player: session.player_round_wins,
                opponent: session.opponent_round_wins,
            },
        });

        if session.round < session.max_rounds {
            session.round += 1;
            session.phase = Phase::RoundStart;
        } else {
            session.phase = Phase::Complete;
        }
    }
}

fn prepared_event(session: &Session, reloaded: bool) -> DuelEvent {
    DuelEvent::RevolverPrepared {
        round: session.round,
        chambers: session.revolver.chambers(),
        bullets: session.revolver.bullets(),
        commitment: session.revolver.commitment().digest_hex(),
        reloaded,
    }
}

fn prompt_event(session: &Session) -> DuelEvent {
    DuelEvent::TurnPrompt {
        actor: session.turn,
        chamber: session.revolver.current_chamber(),
        chambers: session.revolver.chambers(),
        player_lives: session.player_lives,
        opponent_lives: session.opponent_lives,
    }
}

/// Opens the commitment of the cylinder currently in the session.
pub(crate) fn reveal_event(session: &Session) -> DuelEvent {
    DuelEvent::RevolverRevealed {
        round: session.round,
        layout: session.revolver.layout().to_vec(),
        nonce: session.revolver.commitment().nonce_hex(),
    }
}
