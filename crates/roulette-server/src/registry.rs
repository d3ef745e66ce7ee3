//! Participant registry.
//!
//! Owns every known participant, connected or not. Other components get
//! cloned snapshots; nothing outside this module holds a reference across
//! a mutation. The map sits behind a `std::sync::RwLock` that is never
//! held across an `.await`.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use roulette_core::{display_name, Participant, ParticipantId, ParticipantSummary, WagerError};
use tokio::time::Instant;

#[derive(Debug)]
pub struct Registry {
    participants: RwLock<HashMap<ParticipantId, Participant>>,
    starting_balance: u64,
    max_name_len: usize,
}

impl Registry {
    pub fn new(starting_balance: u64, max_name_len: usize) -> Self {
        Registry {
            participants: RwLock::new(HashMap::new()),
            starting_balance,
            max_name_len,
        }
    }

    pub fn starting_balance(&self) -> u64 {
        self.starting_balance
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ParticipantId, Participant>> {
        self.participants.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ParticipantId, Participant>> {
        self.participants.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create the participant if unknown. An existing participant is
    /// returned unchanged.
    pub fn register(&self, id: &ParticipantId) -> Participant {
        self.write()
            .entry(id.clone())
            .or_insert_with(|| Participant::new(id.clone(), self.starting_balance))
            .clone()
    }

    pub fn unregister(&self, id: &ParticipantId) -> Option<Participant> {
        self.write().remove(id)
    }

    pub fn get(&self, id: &ParticipantId) -> Option<Participant> {
        self.read().get(id).cloned()
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.read().contains_key(id)
    }

    /// Stamp the disconnect time. The grace period runs from here.
    pub fn mark_disconnected(&self, id: &ParticipantId) {
        if let Some(p) = self.write().get_mut(id) {
            p.last_disconnect = Some(Instant::now());
        }
    }

    pub fn mark_reconnected(&self, id: &ParticipantId) {
        if let Some(p) = self.write().get_mut(id) {
            p.last_disconnect = None;
        }
    }

    /// Sanitize `raw` and assign it. Empty names and unknown identities
    /// are ignored. Returns the name now in effect.
    pub fn set_display_name(&self, id: &ParticipantId, raw: &str) -> Option<String> {
        let mut guard = self.write();
        let participant = guard.get_mut(id)?;
        if let Some(name) = display_name(raw, id, self.max_name_len) {
            participant.name = name;
        }
        Some(participant.name.clone())
    }

    pub fn display_name(&self, id: &ParticipantId) -> Option<String> {
        self.read().get(id).map(|p| p.name.clone())
    }

    /// Public view of every participant, ordered by name. `connected`
    /// answers whether a participant currently has a live connection.
    pub fn snapshot_all(&self, connected: impl Fn(&ParticipantId) -> bool) -> Vec<ParticipantSummary> {
        let mut players: Vec<ParticipantSummary> = self
            .read()
            .values()
            .map(|p| p.summary(connected(&p.id)))
            .collect();
        players.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.identity.cmp(&b.identity)));
        players
    }

    /// Every known identity.
    pub fn participants(&self) -> Vec<ParticipantId> {
        self.read().keys().cloned().collect()
    }

    /// Take `amount` from the balance. Returns the new balance.
    pub fn debit(&self, id: &ParticipantId, amount: u64) -> Result<u64, WagerError> {
        let mut guard = self.write();
        let participant = guard.get_mut(id).ok_or(WagerError::UnknownParticipant)?;
        if amount > participant.balance {
            return Err(WagerError::InsufficientBalance);
        }
        participant.balance -= amount;
        Ok(participant.balance)
    }

    /// Add `amount` to the balance. `None` if the participant is gone.
    pub fn credit(&self, id: &ParticipantId, amount: u64) -> Option<u64> {
        let mut guard = self.write();
        let participant = guard.get_mut(id)?;
        participant.balance = participant.balance.saturating_add(amount);
        Some(participant.balance)
    }

    /// Reset every zero balance to `amount`.
    pub fn refill_depleted(&self, amount: u64) -> Vec<(ParticipantId, u64)> {
        let mut refilled: Vec<(ParticipantId, u64)> = self
            .write()
            .values_mut()
            .filter(|p| p.balance == 0)
            .map(|p| {
                p.balance = amount;
                (p.id.clone(), amount)
            })
            .collect();
        refilled.sort();
        refilled
    }

    /// Remove participants disconnected for at least `grace` as of `now`.
    ///
    /// Identities for which `connected` answers true are never evicted;
    /// a stale disconnect stamp on them is cleared instead.
    pub fn evict_expired(
        &self,
        now: Instant,
        grace: Duration,
        connected: impl Fn(&ParticipantId) -> bool,
    ) -> Vec<ParticipantId> {
        let mut guard = self.write();
        let mut expired = Vec::new();
        for p in guard.values_mut() {
            if p.last_disconnect.is_none() {
                continue;
            }
            if connected(&p.id) {
                p.last_disconnect = None;
            } else if p.is_expired(now, grace) {
                expired.push(p.id.clone());
            }
        }
        for id in &expired {
            guard.remove(id);
        }
        expired.sort();
        expired
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new(1_000, 20)
    }

    #[test]
    fn register_is_idempotent() {
        let registry = registry();
        let id = ParticipantId::from("abcd1234");
        registry.register(&id);
        registry.debit(&id, 300).unwrap();

        let again = registry.register(&id);
        assert_eq!(again.balance, 700);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn debit_checks_balance_and_identity() {
        let registry = registry();
        let id = ParticipantId::from("abcd1234");
        registry.register(&id);

        assert_eq!(registry.debit(&id, 1_001), Err(WagerError::InsufficientBalance));
        assert_eq!(registry.debit(&id, 1_000), Ok(0));
        assert_eq!(
            registry.debit(&ParticipantId::from("ghost"), 1),
            Err(WagerError::UnknownParticipant)
        );
        assert_eq!(registry.credit(&id, 50), Some(50));
        assert_eq!(registry.credit(&ParticipantId::from("ghost"), 50), None);
    }

    #[test]
    fn display_names_are_sanitized_and_suffixed() {
        let registry = registry();
        let id = ParticipantId::from("9f3ab0c4");
        assert_eq!(registry.register(&id).name, "Player#9f3a");

        assert_eq!(
            registry.set_display_name(&id, "  Al\x07ice123456789012345678").as_deref(),
            Some("Alice123456789012345#9f3a")
        );
        // Empty after sanitizing: keep the current name.
        assert_eq!(
            registry.set_display_name(&id, " \x1b ").as_deref(),
            Some("Alice123456789012345#9f3a")
        );
        assert_eq!(registry.set_display_name(&ParticipantId::from("ghost"), "Bob"), None);
    }

    #[test]
    fn refill_only_touches_zero_balances() {
        let registry = registry();
        let broke = ParticipantId::from("aaaa");
        let fine = ParticipantId::from("bbbb");
        registry.register(&broke);
        registry.register(&fine);
        registry.debit(&broke, 1_000).unwrap();
        registry.debit(&fine, 999).unwrap();

        assert_eq!(registry.refill_depleted(1_000), vec![(broke.clone(), 1_000)]);
        assert_eq!(registry.get(&fine).unwrap().balance, 1);
    }

    #[test]
    fn snapshot_uses_connectivity_probe() {
        let registry = registry();
        let on = ParticipantId::from("aaaa");
        let off = ParticipantId::from("bbbb");
        registry.register(&on);
        registry.register(&off);
        registry.set_display_name(&on, "Ann");
        registry.set_display_name(&off, "Bob");

        let players = registry.snapshot_all(|id| *id == on);
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "Ann#aaaa");
        assert!(players[0].connected);
        assert!(!players[1].connected);
    }

    #[tokio::test(start_paused = true)]
    async fn eviction_waits_for_grace_period() {
        let registry = registry();
        let gone = ParticipantId::from("aaaa");
        let here = ParticipantId::from("bbbb");
        registry.register(&gone);
        registry.register(&here);
        registry.mark_disconnected(&gone);

        let grace = Duration::from_secs(120);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(registry.evict_expired(Instant::now(), grace, |_| false).is_empty());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(registry.evict_expired(Instant::now(), grace, |_| false), vec![gone.clone()]);
        assert!(!registry.contains(&gone));
        assert!(registry.contains(&here));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_clears_disconnect_stamp() {
        let registry = registry();
        let id = ParticipantId::from("aaaa");
        registry.register(&id);
        registry.mark_disconnected(&id);
        tokio::time::advance(Duration::from_secs(100)).await;
        registry.mark_reconnected(&id);
        tokio::time::advance(Duration::from_secs(100)).await;

        assert!(registry.evict_expired(Instant::now(), Duration::from_secs(120), |_| false).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn connected_identities_survive_a_stale_disconnect_stamp() {
        let registry = registry();
        let live = ParticipantId::from("aaaa");
        registry.register(&live);
        registry.mark_disconnected(&live);
        tokio::time::advance(Duration::from_secs(121)).await;

        let grace = Duration::from_secs(120);
        assert!(registry.evict_expired(Instant::now(), grace, |id| *id == live).is_empty());
        assert!(registry.contains(&live));
        assert_eq!(registry.get(&live).and_then(|p| p.last_disconnect), None);
    }
}
