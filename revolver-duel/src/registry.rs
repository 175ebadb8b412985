use crate::config::DuelConfig;
use crate::error::{DuelError, Result};
use crate::session::{ChannelId, Session};
use parking_lot::RwLock;
use revolver_ledger::{Ledger, PlayerId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use tokio::task::JoinHandle;

/// A live session plus the forfeit timer guarding its open prompt.
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) session: Session,
    pub(crate) timer: Option<JoinHandle<()>>,
    prompt_open: Arc<AtomicBool>,
}

impl Slot {
    pub(crate) fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    pub(crate) fn open_prompt(&self) {
        self.prompt_open.store(true, Ordering::Release);
    }

    pub(crate) fn close_prompt(&self) {
        self.prompt_open.store(false, Ordering::Release);
    }

    pub(crate) fn claim_prompt(&self) -> bool {
        claim(&self.prompt_open)
    }
}

/// Registry entry for one player. The prompt flag is readable without the
/// slot lock, so a command can claim the open prompt before it queues.
#[derive(Debug, Clone)]
pub(crate) struct SlotHandle {
    slot: Arc<Mutex<Slot>>,
    prompt_open: Arc<AtomicBool>,
}

impl SlotHandle {
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().await
    }

    /// Take the open prompt. At most one caller wins each prompt; a command
    /// queued behind the winner can never answer the prompt that follows.
    pub(crate) fn claim_prompt(&self) -> bool {
        claim(&self.prompt_open)
    }
}

fn claim(flag: &AtomicBool) -> bool {
    flag.compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}

/// At most one live session per player. Each slot is its own lock, so
/// commands for one player serialize without blocking anyone else.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<PlayerId, SlotHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for `player_id` and hand it back already locked.
    pub(crate) async fn open(
        &self,
        ledger: &dyn Ledger,
        player_id: PlayerId,
        origin_channel: ChannelId,
        bet: i64,
        config: &DuelConfig,
    ) -> Result<OwnedMutexGuard<Slot>> {
        if self.contains(player_id) {
            return Err(DuelError::SessionAlreadyActive(player_id));
        }

        if bet <= 0 {
            return Err(DuelError::InvalidBet(bet));
        }

        let available = ledger.balance(player_id).await?;
        if bet > available {
            return Err(DuelError::InsufficientFunds {
                need: bet,
                available,
            });
        }

        let session = Session::new(
            player_id,
            origin_channel,
            bet,
            config.max_rounds,
            config.lives_per_round,
        );
        let prompt_open = Arc::new(AtomicBool::new(false));
        let slot = Arc::new(Mutex::new(Slot {
            session,
            timer: None,
            prompt_open: prompt_open.clone(),
        }));
        let guard = slot
            .clone()
            .try_lock_owned()
            .map_err(|_| DuelError::internal("Fresh session slot already locked"))?;

        // a concurrent start may have won while the balance was read
        match self.sessions.write().entry(player_id) {
            Entry::Occupied(_) => return Err(DuelError::SessionAlreadyActive(player_id)),
            Entry::Vacant(entry) => {
                entry.insert(SlotHandle { slot, prompt_open });
            }
        }

        tracing::debug!("Opened session for player {}", player_id);
        Ok(guard)
    }

    pub(crate) fn slot(&self, player_id: PlayerId) -> Result<SlotHandle> {
        self.sessions
            .read()
            .get(&player_id)
            .cloned()
            .ok_or(DuelError::NoActiveSession(player_id))
    }

    /// Snapshot of the player's live session.
    pub async fn get(&self, player_id: PlayerId) -> Result<Session> {
        let slot = self.slot(player_id)?;
        let slot = slot.lock().await;
        if slot.session.is_complete() {
            return Err(DuelError::NoActiveSession(player_id));
        }
        Ok(slot.session.clone())
    }

    /// Drop the player's session. Removing an absent player is a no-op.
    pub fn remove(&self, player_id: PlayerId) {
        if self.sessions.write().remove(&player_id).is_some() {
            tracing::debug!("Removed session for player {}", player_id);
        }
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.sessions.read().contains_key(&player_id)
    }

    pub fn active_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn active_players(&self) -> Vec<PlayerId> {
        let mut players: Vec<_> = self.sessions.read().keys().copied().collect();
        players.sort_unstable();
        players
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revolver_ledger::MemoryLedger;

    #[tokio::test]
    async fn test_open_creates_fresh_session() {
        let registry = SessionRegistry::new();
        let ledger = MemoryLedger::new();
        ledger.set_balance(7, 500);

        let guard = registry
            .open(&ledger, 7, 42, 100, &DuelConfig::default())
            .await
            .unwrap();

        assert_eq!(guard.session.bet(), 100);
        assert_eq!(guard.session.round(), 1);
        assert_eq!(guard.session.origin_channel(), 42);
        assert!(registry.contains(7));
        assert_eq!(registry.active_count(), 1);
    }

    #[tokio::test]
    async fn test_open_checks_in_order() {
        let registry = SessionRegistry::new();
        let ledger = MemoryLedger::new();
        ledger.set_balance(1, 50);
        let config = DuelConfig::default();

        let err = registry.open(&ledger, 1, 0, 0, &config).await.unwrap_err();
        assert!(matches!(err, DuelError::InvalidBet(0)));

        let err = registry.open(&ledger, 1, 0, 51, &config).await.unwrap_err();
        assert!(matches!(
            err,
            DuelError::InsufficientFunds {
                need: 51,
                available: 50
            }
        ));
        assert!(!registry.contains(1));

        let _guard = registry.open(&ledger, 1, 0, 50, &config).await.unwrap();
        // an existing session wins over a bad bet
        let err = registry.open(&ledger, 1, 0, -5, &config).await.unwrap_err();
        assert!(matches!(err, DuelError::SessionAlreadyActive(1)));
    }

    #[tokio::test]
    async fn test_prompt_claimed_once_without_lock() {
        let registry = SessionRegistry::new();
        let ledger = MemoryLedger::new();
        ledger.set_balance(4, 500);

        let guard = registry
            .open(&ledger, 4, 0, 10, &DuelConfig::default())
            .await
            .unwrap();
        let handle = registry.slot(4).unwrap();
        assert!(!handle.claim_prompt());

        // the slot stays locked while the prompt is claimed
        guard.open_prompt();
        assert!(handle.claim_prompt());
        assert!(!handle.claim_prompt());
        assert!(!guard.claim_prompt());

        guard.open_prompt();
        guard.close_prompt();
        assert!(!handle.claim_prompt());
    }

    #[tokio::test]
    async fn test_get_and_idempotent_remove() {
        let registry = SessionRegistry::new();
        let ledger = MemoryLedger::new();
        ledger.set_balance(3, 500);

        let guard = registry
            .open(&ledger, 3, 0, 10, &DuelConfig::default())
            .await
            .unwrap();
        drop(guard);

        assert_eq!(registry.get(3).await.unwrap().bet(), 10);

        registry.remove(3);
        registry.remove(3);
        assert!(matches!(
            registry.get(3).await,
            Err(DuelError::NoActiveSession(3))
        ));
        assert_eq!(registry.active_players(), Vec::<PlayerId>::new());
    }
}
