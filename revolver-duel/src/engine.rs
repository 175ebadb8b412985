use crate::config::DuelConfig;
use crate::error::{DuelError, Result};
use crate::events::{DuelEvent, DuelNotice};
use crate::policy::{Action, HeuristicOpponent, OpponentStrategy};
use crate::registry::{SessionRegistry, Slot};
use crate::revolver::RevolverFactory;
use crate::round::{reveal_event, Progress, RoundController};
use crate::session::{ChannelId, Session};
use crate::settlement::{MatchOutcome, SettlementEngine, SettlementResult};
use crate::shot::ShotOutcome;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use revolver_ledger::{Ledger, PlayerId};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

const NOTICE_CAPACITY: usize = 256;

/// Returned by `start`: the new session and everything that happened up to
/// the first player prompt.
#[derive(Debug, Clone)]
pub struct StartReport {
    pub session: Session,
    pub events: Vec<DuelEvent>,
}

/// Returned by the choice commands. `settlement` is set when the shot
/// finished the match.
#[derive(Debug, Clone)]
pub struct ShotReport {
    pub outcome: ShotOutcome,
    pub events: Vec<DuelEvent>,
    pub settlement: Option<SettlementResult>,
}

struct Inner {
    config: DuelConfig,
    ledger: Arc<dyn Ledger>,
    registry: SessionRegistry,
    factory: RevolverFactory,
    strategy: Box<dyn OpponentStrategy>,
    settlement: SettlementEngine,
    rng: Mutex<StdRng>,
    notices: broadcast::Sender<DuelNotice>,
}

/// Entry point for the duel commands. Cheap to clone; clones share sessions.
#[derive(Clone)]
pub struct DuelEngine {
    inner: Arc<Inner>,
}

impl DuelEngine {
    pub fn new(config: DuelConfig, ledger: Arc<dyn Ledger>) -> Result<Self> {
        Self::with_strategy(config, ledger, Box::new(HeuristicOpponent))
    }

    pub fn with_strategy(
        config: DuelConfig,
        ledger: Arc<dyn Ledger>,
        strategy: Box<dyn OpponentStrategy>,
    ) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        Ok(Self {
            inner: Arc::new(Inner {
                factory: RevolverFactory::from_config(&config),
                settlement: SettlementEngine::from_config(&config),
                config,
                ledger,
                registry: SessionRegistry::new(),
                strategy,
                rng: Mutex::new(rng),
                notices,
            }),
        })
    }

    pub fn config(&self) -> &DuelConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    /// Every event the engine emits, including timeout forfeits that happen
    /// outside any command.
    pub fn subscribe(&self) -> broadcast::Receiver<DuelNotice> {
        self.inner.notices.subscribe()
    }

    pub async fn session(&self, player_id: PlayerId) -> Result<Session> {
        self.inner.registry.get(player_id).await
    }

    pub async fn start(
        &self,
        player_id: PlayerId,
        origin_channel: ChannelId,
        bet: i64,
    ) -> Result<StartReport> {
        let inner = &self.inner;
        let mut slot = inner
            .registry
            .open(&*inner.ledger, player_id, origin_channel, bet, &inner.config)
            .await?;

        let (progress, mut events) = {
            let mut rng = inner.rng.lock();
            let mut controller = RoundController::new(
                &inner.config,
                &inner.factory,
                &*inner.strategy,
                &mut *rng,
            );
            let progress = controller.begin_match(&mut slot.session);
            (progress, controller.into_events())
        };

        let settled = self.advance(&mut slot, progress, &mut events).await;
        self.publish(player_id, &events);
        settled?;

        Ok(StartReport {
            session: slot.session.clone(),
            events,
        })
    }

    pub async fn choose_self(&self, player_id: PlayerId) -> Result<ShotReport> {
        self.choose(player_id, Action::ShootSelf).await
    }

    pub async fn choose_opponent(&self, player_id: PlayerId) -> Result<ShotReport> {
        self.choose(player_id, Action::ShootOpponent).await
    }

    /// Concede the match. Accepted in any phase while the session exists.
    pub async fn surrender(&self, player_id: PlayerId) -> Result<SettlementResult> {
        let slot = self.inner.registry.slot(player_id)?;
        let mut slot = slot.lock().await;
        if slot.session.is_complete() {
            return Err(DuelError::NoActiveSession(player_id));
        }

        info!(
            "Player {} surrendered duel {} in round {}",
            player_id, slot.session.id, slot.session.round
        );
        self.concede(&mut slot, MatchOutcome::Surrendered).await
    }

    async fn choose(&self, player_id: PlayerId, action: Action) -> Result<ShotReport> {
        let inner = &self.inner;
        let handle = inner.registry.slot(player_id)?;
        // claimed before queueing on the lock, so a duplicate cannot wait
        // its way into the next prompt
        if !handle.claim_prompt() {
            return Err(DuelError::NotPlayersTurn);
        }
        let mut slot = handle.lock().await;
        if slot.session.is_complete() {
            return Err(DuelError::NoActiveSession(player_id));
        }

        let (outcome, progress, mut events) = {
            let mut rng = inner.rng.lock();
            let mut controller = RoundController::new(
                &inner.config,
                &inner.factory,
                &*inner.strategy,
                &mut *rng,
            );
            let (outcome, progress) = controller.player_action(&mut slot.session, action)?;
            (outcome, progress, controller.into_events())
        };
        slot.cancel_timer();

        let settled = self.advance(&mut slot, progress, &mut events).await;
        self.publish(player_id, &events);

        Ok(ShotReport {
            outcome,
            events,
            settlement: settled?,
        })
    }

    /// Arm the prompt timer, or settle a finished match.
    async fn advance(
        &self,
        slot: &mut Slot,
        progress: Progress,
        events: &mut Vec<DuelEvent>,
    ) -> Result<Option<SettlementResult>> {
        match progress {
            Progress::AwaitingPlayer => {
                slot.open_prompt();
                self.arm_timer(slot);
                Ok(None)
            }
            Progress::MatchComplete => {
                let outcome = SettlementEngine::outcome_of(&slot.session);
                let result = self
                    .inner
                    .settlement
                    .settle(
                        &*self.inner.ledger,
                        &self.inner.registry,
                        &mut slot.session,
                        outcome,
                    )
                    .await?;
                events.push(result.to_event());
                Ok(Some(result))
            }
        }
    }

    async fn concede(&self, slot: &mut Slot, outcome: MatchOutcome) -> Result<SettlementResult> {
        slot.cancel_timer();
        slot.close_prompt();

        let mut events = vec![reveal_event(&slot.session)];
        let result = self
            .inner
            .settlement
            .settle(
                &*self.inner.ledger,
                &self.inner.registry,
                &mut slot.session,
                outcome,
            )
            .await;
        if let Ok(settled) = &result {
            events.push(settled.to_event());
        }

        self.publish(slot.session.player_id, &events);
        result
    }

    fn arm_timer(&self, slot: &mut Slot) {
        slot.cancel_timer();

        let engine: Weak<Inner> = Arc::downgrade(&self.inner);
        let player_id = slot.session.player_id;
        let session_id = slot.session.id;
        let prompt_seq = slot.session.prompt_seq;
        let timeout = self.inner.config.choice_timeout();

        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = engine.upgrade() {
                DuelEngine { inner }
                    .expire(player_id, session_id, prompt_seq)
                    .await;
            }
        }));
    }

    /// Forfeit the session if the prompt that armed this timer is still open.
    async fn expire(&self, player_id: PlayerId, session_id: Uuid, prompt_seq: u64) {
        let Ok(slot) = self.inner.registry.slot(player_id) else {
            return;
        };
        let mut slot = slot.lock().await;

        let session = &slot.session;
        if session.id != session_id
            || session.prompt_seq != prompt_seq
            || !session.awaiting_player_choice
            || session.is_complete()
        {
            return;
        }
        // a choice that claimed the prompt is already queued on the lock
        if !slot.claim_prompt() {
            return;
        }

        warn!(
            "Player {} did not answer within {:?}, forfeiting duel {}",
            player_id, self.inner.config.choice_timeout(), session_id
        );

        // this task owns the handle; aborting it here would cancel the forfeit
        slot.timer = None;
        if let Err(e) = self.concede(&mut slot, MatchOutcome::Forfeited).await {
            warn!("Forfeit of duel {} failed: {}", session_id, e);
        }
    }

    fn publish(&self, player_id: PlayerId, events: &[DuelEvent]) {
        for event in events {
            // no subscribers is fine
            let _ = self.inner.notices.send(DuelNotice {
                player_id,
                event: event.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revolver::Revolver;
    use crate::session::{Phase, Side};
    use revolver_ledger::{EntryReason, MemoryLedger};
    use std::time::Duration;

    const PLAYER: PlayerId = 1;

    fn engine_with_balance(balance: i64) -> (DuelEngine, Arc<MemoryLedger>) {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.set_balance(PLAYER, balance);
        let engine = DuelEngine::new(DuelConfig::seeded(11), ledger.clone()).unwrap();
        (engine, ledger)
    }

    async fn rig(engine: &DuelEngine, edit: impl FnOnce(&mut Session)) {
        let handle = engine.inner.registry.slot(PLAYER).unwrap();
        let mut slot = handle.lock().await;
        edit(&mut slot.session);
        if slot.session.awaiting_player_choice {
            slot.open_prompt();
        } else {
            slot.close_prompt();
        }
    }

    /// Player to act on a fresh cylinder in the last round.
    fn final_round(session: &mut Session, player_wins: u32, opponent_wins: u32) {
        session.round = 3;
        session.player_round_wins = player_wins;
        session.opponent_round_wins = opponent_wins;
        session.player_lives = 3;
        session.opponent_lives = 3;
        session.revolver = Revolver::from_layout(vec![true, false, false, false, false, false]);
        session.turn = Side::Player;
        session.phase = Phase::TurnLoop;
        session.awaiting_player_choice = true;
    }

    fn drain(notices: &mut broadcast::Receiver<DuelNotice>) -> Vec<DuelEvent> {
        let mut events = Vec::new();
        while let Ok(notice) = notices.try_recv() {
            assert_eq!(notice.player_id, PLAYER);
            events.push(notice.event);
        }
        events
    }

    #[tokio::test]
    async fn test_start_opens_round_one() {
        let (engine, _ledger) = engine_with_balance(500);

        let report = engine.start(PLAYER, 9, 100).await.unwrap();

        assert_eq!(report.session.bet(), 100);
        assert_eq!(report.session.round(), 1);
        assert!(report.session.awaiting_player_choice());
        assert_eq!(report.events[1], DuelEvent::RoundStarted { round: 1, lives: 3 });

        // lives only move on loaded shots fired before the first prompt
        let (player_lives, opponent_lives) = report
            .events
            .iter()
            .filter_map(|e| match e {
                DuelEvent::Shot(shot) => Some((shot.player_lives, shot.opponent_lives)),
                _ => None,
            })
            .last()
            .unwrap_or((3, 3));
        assert_eq!(report.session.player_lives(), player_lives);
        assert_eq!(report.session.opponent_lives(), opponent_lives);

        let err = engine.start(PLAYER, 9, 100).await.unwrap_err();
        assert!(matches!(err, DuelError::SessionAlreadyActive(PLAYER)));
    }

    #[tokio::test]
    async fn test_start_rejects_bad_bets() {
        let (engine, _ledger) = engine_with_balance(500);

        assert!(matches!(
            engine.start(PLAYER, 0, -1).await,
            Err(DuelError::InvalidBet(-1))
        ));
        assert!(matches!(
            engine.start(PLAYER, 0, 501).await,
            Err(DuelError::InsufficientFunds { .. })
        ));
        assert!(engine.session(PLAYER).await.is_err());
    }

    #[tokio::test]
    async fn test_winning_final_round_pays_out() {
        let (engine, ledger) = engine_with_balance(500);
        engine.start(PLAYER, 0, 100).await.unwrap();
        rig(&engine, |s| {
            final_round(s, 1, 1);
            s.opponent_lives = 1;
        })
        .await;

        let report = engine.choose_opponent(PLAYER).await.unwrap();

        let settlement = report.settlement.unwrap();
        assert_eq!(settlement.outcome, MatchOutcome::PlayerWon);
        assert_eq!(settlement.payout, 300);
        assert_eq!(settlement.player_round_wins, 2);
        assert_eq!(ledger.balance(PLAYER).await.unwrap(), 800);
        assert_eq!(
            report.events.last(),
            Some(&DuelEvent::MatchEnded {
                winner: Some(Side::Player),
                outcome: MatchOutcome::PlayerWon,
                payout: 300,
            })
        );
        assert!(matches!(
            engine.session(PLAYER).await,
            Err(DuelError::NoActiveSession(PLAYER))
        ));
    }

    #[tokio::test]
    async fn test_surrender_debits_half_bet() {
        let (engine, ledger) = engine_with_balance(500);
        let mut notices = engine.subscribe();
        engine.start(PLAYER, 0, 100).await.unwrap();
        drain(&mut notices);

        let settlement = engine.surrender(PLAYER).await.unwrap();

        assert_eq!(settlement.payout, -50);
        assert_eq!(settlement.balance_after, 450);
        assert_eq!(ledger.balance(PLAYER).await.unwrap(), 450);
        assert_eq!(
            ledger.history(PLAYER).await.unwrap()[0].reason,
            EntryReason::Surrender
        );
        assert!(matches!(
            engine.choose_self(PLAYER).await,
            Err(DuelError::NoActiveSession(PLAYER))
        ));

        let events = drain(&mut notices);
        assert!(matches!(events[0], DuelEvent::RevolverRevealed { .. }));
        assert!(matches!(
            events[1],
            DuelEvent::MatchEnded {
                outcome: MatchOutcome::Surrendered,
                payout: -50,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_choice_out_of_turn_changes_nothing() {
        let (engine, _ledger) = engine_with_balance(500);
        engine.start(PLAYER, 0, 100).await.unwrap();
        rig(&engine, |s| {
            s.awaiting_player_choice = false;
            s.turn = Side::Opponent;
        })
        .await;
        let before = engine.session(PLAYER).await.unwrap();

        let err = engine.choose_self(PLAYER).await.unwrap_err();

        assert!(matches!(err, DuelError::NotPlayersTurn));
        let after = engine.session(PLAYER).await.unwrap();
        assert_eq!(
            after.revolver().current_chamber(),
            before.revolver().current_chamber()
        );
        assert_eq!(after.player_lives(), before.player_lives());
        assert_eq!(after.opponent_lives(), before.opponent_lives());
    }

    #[tokio::test]
    async fn test_duplicate_choices_fire_one_chamber() {
        let (engine, _ledger) = engine_with_balance(500);
        engine.start(PLAYER, 0, 100).await.unwrap();
        rig(&engine, |s| {
            final_round(s, 0, 0);
            s.revolver = Revolver::from_layout(vec![false, false, false, false, false, true]);
        })
        .await;

        // both commands queue behind a held lock, then land on an empty
        // chamber that hands the player a bonus turn
        let handle = engine.inner.registry.slot(PLAYER).unwrap();
        let guard = handle.lock().await;
        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.choose_self(PLAYER).await }
        });
        let second = tokio::spawn({
            let engine = engine.clone();
            async move { engine.choose_self(PLAYER).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);

        let results = [first.await.unwrap(), second.await.unwrap()];
        let fired: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(fired.len(), 1);
        assert!(!fired[0].outcome.loaded);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(DuelError::NotPlayersTurn))));

        let session = engine.session(PLAYER).await.unwrap();
        assert_eq!(session.revolver().current_chamber(), 1);
        assert_eq!(session.turn(), Side::Player);
        assert!(session.awaiting_player_choice());

        // the bonus turn is still answerable exactly once
        engine.choose_self(PLAYER).await.unwrap();
        assert_eq!(
            engine.session(PLAYER).await.unwrap().revolver().current_chamber(),
            2
        );
    }

    #[tokio::test]
    async fn test_concurrent_final_shots_settle_once() {
        let (engine, ledger) = engine_with_balance(500);
        engine.start(PLAYER, 0, 100).await.unwrap();
        rig(&engine, |s| {
            final_round(s, 0, 2);
            s.player_lives = 1;
        })
        .await;

        let (first, second) = tokio::join!(engine.choose_self(PLAYER), engine.choose_self(PLAYER));

        let (ok, err) = match (first, second) {
            (Ok(report), Err(e)) | (Err(e), Ok(report)) => (report, e),
            other => panic!("expected exactly one shot, got {:?}", other),
        };
        assert!(ok.outcome.loaded);
        // depending on interleaving the loser sees the claimed prompt or
        // the already removed session
        assert!(matches!(
            err,
            DuelError::NotPlayersTurn | DuelError::NoActiveSession(PLAYER)
        ));

        let history = ledger.history(PLAYER).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reason, EntryReason::DuelLoss);
        assert_eq!(ledger.balance(PLAYER).await.unwrap(), 400);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_prompt_forfeits() {
        let (engine, ledger) = engine_with_balance(500);
        let mut notices = engine.subscribe();
        engine.start(PLAYER, 0, 100).await.unwrap();

        tokio::time::sleep(Duration::from_secs(31)).await;

        assert!(matches!(
            engine.session(PLAYER).await,
            Err(DuelError::NoActiveSession(PLAYER))
        ));
        assert_eq!(ledger.balance(PLAYER).await.unwrap(), 450);
        assert_eq!(
            ledger.history(PLAYER).await.unwrap()[0].reason,
            EntryReason::Forfeit
        );
        assert!(drain(&mut notices).iter().any(|e| matches!(
            e,
            DuelEvent::MatchEnded {
                outcome: MatchOutcome::Forfeited,
                ..
            }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_answered_prompt_rearms_timer() {
        let (engine, ledger) = engine_with_balance(500);
        engine.start(PLAYER, 0, 100).await.unwrap();

        tokio::time::sleep(Duration::from_secs(20)).await;
        engine.choose_opponent(PLAYER).await.unwrap();

        // the first prompt's deadline has passed; the second has not
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(engine.session(PLAYER).await.is_ok());
        assert_eq!(ledger.balance(PLAYER).await.unwrap(), 500);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(engine.session(PLAYER).await.is_err());
        assert_eq!(ledger.balance(PLAYER).await.unwrap(), 450);
    }
}
