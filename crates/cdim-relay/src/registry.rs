//! Pair registry: maps pair ids to their participants and bounded history.
//!
//! Each pair sits behind its own mutex so work on different pairs never
//! waits on the same lock; the outer map lock is only held for lookup and
//! insertion, never while waiting for a pair. A pair removed from the map
//! is marked retired under its lock, and anyone who later acquires the
//! stale handle retries against a fresh entry.

use std::collections::{HashMap, VecDeque};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use cdim_config::HistoryConfig;
use indexmap::IndexMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::outbox::Outbox;
use crate::protocol::{ChatMessage, PresenceEntry};

/// Messages retained per pair by default.
pub const DEFAULT_MAX_HISTORY: usize = 500;

/// Messages replayed to a joiner by default.
pub const DEFAULT_REPLAY_LIMIT: usize = 100;

/// Per-pair history bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    pub max_messages: usize,
    pub replay_limit: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_HISTORY,
            replay_limit: DEFAULT_REPLAY_LIMIT,
        }
    }
}

impl From<&HistoryConfig> for HistoryLimits {
    fn from(config: &HistoryConfig) -> Self {
        Self {
            max_messages: config.max_messages as usize,
            replay_limit: config.replay_limit as usize,
        }
    }
}

/// One connected identity within a pair.
#[derive(Debug, Clone)]
pub struct Participant {
    pub identifier: String,
    pub display_name: String,
    pub channel: Outbox,
}

/// Read-only view used to build welcome and presence events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSnapshot {
    pub participants: Vec<PresenceEntry>,
    /// Most recent messages, oldest first, capped at the replay limit.
    pub history: Vec<ChatMessage>,
}

/// Participants and history of one pair.
#[derive(Debug)]
pub struct PairState {
    participants: IndexMap<String, Participant>,
    history: VecDeque<ChatMessage>,
    limits: HistoryLimits,
    retired: bool,
}

impl PairState {
    fn new(limits: HistoryLimits) -> Self {
        Self {
            participants: IndexMap::new(),
            history: VecDeque::new(),
            limits,
            retired: false,
        }
    }

    /// Insert or replace the participant keyed by its identifier. A
    /// replaced entry keeps its position in the presence order and is
    /// returned.
    pub fn add_participant(&mut self, participant: Participant) -> Option<Participant> {
        self.participants
            .insert(participant.identifier.clone(), participant)
    }

    pub fn remove_participant(&mut self, identifier: &str) -> Option<Participant> {
        self.participants.shift_remove(identifier)
    }

    pub fn participant(&self, identifier: &str) -> Option<&Participant> {
        self.participants.get(identifier)
    }

    /// Participants in join order.
    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn presence(&self) -> Vec<PresenceEntry> {
        self.participants
            .values()
            .map(|p| PresenceEntry {
                user_id: p.identifier.clone(),
                display_name: p.display_name.clone(),
            })
            .collect()
    }

    /// Append a message, evicting the oldest ones past the retention limit.
    pub fn append_history(&mut self, message: ChatMessage) {
        self.history.push_back(message);
        while self.history.len() > self.limits.max_messages {
            self.history.pop_front();
        }
    }

    /// Full retained history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &ChatMessage> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// The most recent `limit` messages, oldest first.
    pub fn recent_history(&self, limit: usize) -> Vec<ChatMessage> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).cloned().collect()
    }

    pub fn snapshot(&self) -> PairSnapshot {
        PairSnapshot {
            participants: self.presence(),
            history: self.recent_history(self.limits.replay_limit),
        }
    }

    /// No participants and no history: eligible for removal.
    pub fn is_vacant(&self) -> bool {
        self.participants.is_empty() && self.history.is_empty()
    }
}

type PairCell = Arc<Mutex<PairState>>;

/// Process-wide pair registry. Cloning shares the same state.
#[derive(Clone)]
pub struct PairRegistry {
    pairs: Arc<RwLock<HashMap<String, PairCell>>>,
    limits: HistoryLimits,
}

impl PairRegistry {
    pub fn new(limits: HistoryLimits) -> Self {
        Self {
            pairs: Arc::new(RwLock::new(HashMap::new())),
            limits,
        }
    }

    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    /// Return the pair's state handle, creating an empty pair if unknown.
    pub async fn get_or_create(&self, pair_id: &str) -> Arc<Mutex<PairState>> {
        if let Some(cell) = self.pairs.read().await.get(pair_id) {
            return cell.clone();
        }
        let mut map = self.pairs.write().await;
        map.entry(pair_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(PairState::new(self.limits))))
            .clone()
    }

    async fn existing(&self, pair_id: &str) -> Option<PairCell> {
        self.pairs.read().await.get(pair_id).cloned()
    }

    /// Enter the pair's critical section, creating the pair if needed.
    pub async fn lock(&self, pair_id: &str) -> PairLock {
        loop {
            let cell = self.get_or_create(pair_id).await;
            if let Some(lock) = self.acquire(pair_id, cell).await {
                return lock;
            }
        }
    }

    /// Enter the pair's critical section only if the pair exists.
    pub async fn lock_existing(&self, pair_id: &str) -> Option<PairLock> {
        loop {
            let cell = self.existing(pair_id).await?;
            if let Some(lock) = self.acquire(pair_id, cell).await {
                return Some(lock);
            }
        }
    }

    /// Lock `cell`, or drop its stale map entry and return None if it was
    /// retired while we waited.
    async fn acquire(&self, pair_id: &str, cell: PairCell) -> Option<PairLock> {
        let state = cell.clone().lock_owned().await;
        if state.retired {
            drop(state);
            self.forget(pair_id, &cell).await;
            return None;
        }
        Some(PairLock {
            pair_id: pair_id.to_string(),
            cell,
            state,
            registry: self.clone(),
        })
    }

    /// Remove the map entry for `pair_id` if it still points at `cell`.
    async fn forget(&self, pair_id: &str, cell: &PairCell) {
        let mut map = self.pairs.write().await;
        if map.get(pair_id).is_some_and(|current| Arc::ptr_eq(current, cell)) {
            map.remove(pair_id);
        }
    }

    /// Insert or replace a participant. Returns the replaced entry.
    pub async fn add_participant(
        &self,
        pair_id: &str,
        identifier: &str,
        display_name: &str,
        channel: Outbox,
    ) -> Option<Participant> {
        let mut pair = self.lock(pair_id).await;
        pair.add_participant(Participant {
            identifier: identifier.to_string(),
            display_name: display_name.to_string(),
            channel,
        })
    }

    /// Remove a participant; removes the pair too once it is vacant.
    /// Unknown pairs and identifiers are a no-op. Returns whether an entry
    /// was removed.
    pub async fn remove_participant(&self, pair_id: &str, identifier: &str) -> bool {
        let Some(mut pair) = self.lock_existing(pair_id).await else {
            return false;
        };
        let removed = pair.remove_participant(identifier).is_some();
        pair.release().await;
        removed
    }

    /// Append to an existing pair's history. Unknown pairs are a no-op.
    pub async fn append_history(&self, pair_id: &str, message: ChatMessage) -> bool {
        match self.lock_existing(pair_id).await {
            Some(mut pair) => {
                pair.append_history(message);
                true
            }
            None => false,
        }
    }

    pub async fn snapshot(&self, pair_id: &str) -> Option<PairSnapshot> {
        let pair = self.lock_existing(pair_id).await?;
        Some(pair.snapshot())
    }

    pub async fn contains(&self, pair_id: &str) -> bool {
        self.pairs.read().await.contains_key(pair_id)
    }

    /// Number of pairs currently held.
    pub async fn len(&self) -> usize {
        self.pairs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pairs.read().await.is_empty()
    }
}

impl Default for PairRegistry {
    fn default() -> Self {
        Self::new(HistoryLimits::default())
    }
}

/// Exclusive access to one pair's state.
///
/// Dropping the lock leaves the pair in the registry. Call
/// [`PairLock::release`] after removing participants so a vacant pair is
/// collected.
pub struct PairLock {
    pair_id: String,
    cell: PairCell,
    state: OwnedMutexGuard<PairState>,
    registry: PairRegistry,
}

impl PairLock {
    pub fn pair_id(&self) -> &str {
        &self.pair_id
    }

    /// Unlock, removing the pair from the registry if it is vacant.
    /// Returns whether the pair was removed.
    pub async fn release(self) -> bool {
        let PairLock {
            pair_id,
            cell,
            mut state,
            registry,
        } = self;
        if !state.is_vacant() {
            return false;
        }
        state.retired = true;
        drop(state);
        registry.forget(&pair_id, &cell).await;
        true
    }
}

impl Deref for PairLock {
    type Target = PairState;

    fn deref(&self) -> &PairState {
        &self.state
    }
}

impl DerefMut for PairLock {
    fn deref_mut(&mut self) -> &mut PairState {
        &mut self.state
    }
}
