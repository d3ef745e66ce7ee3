//! Round engine.
//!
//! Owns the live [`Round`], the outcome history and the outcome source,
//! and drives them through `Betting -> Drawing -> Settling` forever.
//!
//! The betting cutoff is a reader/writer barrier on the round:
//! - [`RoundEngine::submit_wager`] holds the *shared* guard for the phase
//!   check, the debit and the append
//! - [`RoundEngine::close_betting`] takes the *exclusive* guard to flip
//!   the phase
//!
//! `tokio::sync::RwLock` is write-preferring, so once the flip is queued
//! no new submission gets in, and the flip itself waits for every
//! submission already holding the guard.
//!
//! Everything the engine says goes out through a [`Broadcaster`]; it
//! never sees a connection.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use roulette_core::{
    validate, DrawError, History, Outcome, OutcomeSource, ParticipantId, Payout, Phase, Round,
    RoundStatus, Wager, WagerError,
};
use roulette_protocol::{OutboundEvent, PayoutLine};
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info};

use crate::config::RoundTiming;
use crate::hub::{Broadcaster, ConnectivityProbe};
use crate::registry::Registry;
use crate::types::{encode, shutdown_channel, wait_for_shutdown, Shutdown, ShutdownTrigger};

/// An accepted wager and the submitter's balance after the debit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub wager: Wager,
    pub balance: u64,
}

pub struct RoundEngine<O> {
    round: RwLock<Round>,
    history: Mutex<History>,
    status: watch::Sender<RoundStatus>,
    wheel: Mutex<Box<dyn OutcomeSource>>,
    registry: Arc<Registry>,
    outbound: O,
    timing: RoundTiming,
    stop: ShutdownTrigger,
}

impl<O> RoundEngine<O>
where
    O: Broadcaster + ConnectivityProbe,
{
    pub fn new(
        registry: Arc<Registry>,
        outbound: O,
        wheel: Box<dyn OutcomeSource>,
        timing: RoundTiming,
    ) -> Self {
        let (status, _) = watch::channel(RoundStatus::betting(timing.betting_secs()));
        let (stop, _) = shutdown_channel();
        RoundEngine {
            round: RwLock::new(Round::new()),
            history: Mutex::new(History::new()),
            status,
            wheel: Mutex::new(wheel),
            registry,
            outbound,
            timing,
            stop,
        }
    }

    pub fn timing(&self) -> RoundTiming {
        self.timing
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Phase, outcome (settling only) and countdown (betting only).
    /// Lock-free; reads the last published snapshot.
    pub fn current_state(&self) -> RoundStatus {
        *self.status.borrow()
    }

    /// Follow phase and countdown changes.
    pub fn subscribe(&self) -> watch::Receiver<RoundStatus> {
        self.status.subscribe()
    }

    /// Past outcomes, most recent first.
    pub fn history(&self) -> Vec<u8> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .numbers()
    }

    /// Wagers on the live round, in submission order.
    pub async fn wagers(&self) -> Vec<Wager> {
        self.round.read().await.wagers()
    }

    /// A `game_state` event describing where the round is now.
    pub fn game_state(&self) -> OutboundEvent {
        let status = self.current_state();
        OutboundEvent::GameState {
            phase: status.phase,
            outcome: status.outcome.map(Outcome::number),
            countdown: status.countdown,
            history: self.history(),
        }
    }

    // ------------------------------------------------------------------
    // Wager submission
    // ------------------------------------------------------------------

    /// Validate, debit and append one wager.
    ///
    /// Validation runs before any shared state is touched. The phase
    /// check, debit and append all happen under one shared guard, so a
    /// wager either lands in the round that was open when it was checked
    /// or fails with [`WagerError::PhaseClosed`].
    pub async fn submit_wager(
        &self,
        participant: &ParticipantId,
        category: &str,
        selector: &str,
        stake: i64,
    ) -> Result<Placement, WagerError> {
        let (selection, stake) = validate(category, selector, stake)?;

        let round = self.round.read().await;
        if !round.is_open() {
            return Err(WagerError::PhaseClosed);
        }
        let balance = self.registry.debit(participant, stake)?;
        let wager = Wager {
            participant: participant.clone(),
            selection,
            stake,
        };
        round.append(wager.clone());

        Ok(Placement { wager, balance })
    }

    // ------------------------------------------------------------------
    // Phase steps
    // ------------------------------------------------------------------

    /// Replace the live round with a fresh one and announce betting.
    pub async fn open_round(&self) {
        *self.round.write().await = Round::new();

        let seconds = self.timing.betting_secs();
        self.status.send_replace(RoundStatus::betting(seconds));
        info!(seconds, "betting open");
        self.publish(&self.game_state());
    }

    /// Per-second countdown during betting.
    pub fn tick(&self, seconds_remaining: u32) {
        self.status.send_replace(RoundStatus::betting(seconds_remaining));
        self.publish(&OutboundEvent::Countdown {
            phase: Phase::Betting,
            seconds_remaining,
        });
    }

    /// Stop accepting wagers. Waits for every in-flight submission to
    /// finish; none started afterwards can succeed. Returns the number of
    /// wagers in the closed round.
    pub async fn close_betting(&self) -> usize {
        let mut round = self.round.write().await;
        round.close();
        let count = round.wager_count();
        // Under the guard, so nobody reads a betting status for a closed round.
        self.status.send_replace(RoundStatus::drawing());
        drop(round);

        info!(wagers = count, "betting closed");
        count
    }

    /// Draw the outcome for the closed round and announce the drawing
    /// phase. The outcome itself is not revealed until settlement.
    pub async fn draw(&self) -> Result<Outcome, DrawError> {
        let outcome = self
            .wheel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .draw()?;
        self.round.write().await.set_outcome(outcome);

        debug!(outcome = outcome.number(), "outcome drawn");
        self.publish(&self.game_state());
        Ok(outcome)
    }

    /// Pay out the closed round.
    ///
    /// Records the outcome, credits winners, sends a personal `result`
    /// to every connected participant (with or without wagers), then
    /// broadcasts the public `game_state` and any balance changes.
    pub async fn settle(&self, outcome: Outcome) -> Vec<Payout> {
        let wagers = self.round.write().await.settle();
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(outcome);
        self.status.send_replace(RoundStatus::settling(outcome));

        let payouts = roulette_core::settle(outcome, &wagers);

        let mut by_participant: BTreeMap<&ParticipantId, Vec<&Payout>> = BTreeMap::new();
        for payout in &payouts {
            by_participant.entry(&payout.wager.participant).or_default().push(payout);
        }

        let mut credited: BTreeMap<ParticipantId, u64> = BTreeMap::new();
        for (participant, lines) in &by_participant {
            let returned: u64 = lines.iter().map(|p| p.returned()).sum();
            if returned == 0 {
                continue;
            }
            if let Some(balance) = self.registry.credit(participant, returned) {
                credited.insert((*participant).clone(), balance);
            }
        }

        let online: HashSet<ParticipantId> = self.outbound.connected_identities().await;
        for participant in self.registry.participants() {
            if !online.contains(&participant) {
                continue;
            }
            let Some(balance) = self.registry.get(&participant).map(|p| p.balance) else {
                continue;
            };
            let lines = by_participant.get(&participant).map(Vec::as_slice).unwrap_or_default();
            let result = OutboundEvent::RoundResult {
                outcome: outcome.number(),
                payouts: lines.iter().map(|p| PayoutLine::from(*p)).collect(),
                total_returned: lines.iter().map(|p| p.returned()).sum(),
                balance,
            };
            self.notify(&participant, &result);
        }

        info!(
            outcome = outcome.number(),
            wagers = payouts.len(),
            winners = credited.len(),
            "round settled"
        );
        self.publish(&self.game_state());
        for (identity, balance) in credited {
            self.publish(&OutboundEvent::PlayerBalanceUpdated { identity, balance });
        }

        payouts
    }

    /// Give every participant at zero a fresh starting balance.
    pub fn refill_depleted(&self) -> Vec<(ParticipantId, u64)> {
        let refilled = self.registry.refill_depleted(self.registry.starting_balance());
        for (identity, balance) in &refilled {
            info!(%identity, balance, "balance refilled");
            self.publish(&OutboundEvent::PlayerBalanceUpdated {
                identity: identity.clone(),
                balance: *balance,
            });
        }
        refilled
    }

    /// Drop the closed round after a failed draw and refund every stake.
    /// Returns each refunded participant's balance afterwards.
    pub async fn abandon_round(&self, cause: &DrawError) -> Vec<(ParticipantId, u64)> {
        let wagers = self.round.write().await.abandon();
        error!(error = %cause, wagers = wagers.len(), "draw failed, abandoning round");

        let mut refunded: BTreeMap<ParticipantId, u64> = BTreeMap::new();
        for wager in wagers {
            if let Some(balance) = self.registry.credit(&wager.participant, wager.stake) {
                refunded.insert(wager.participant, balance);
            }
        }
        for (identity, balance) in &refunded {
            self.publish(&OutboundEvent::PlayerBalanceUpdated {
                identity: identity.clone(),
                balance: *balance,
            });
        }
        refunded.into_iter().collect()
    }

    // ------------------------------------------------------------------
    // Driver
    // ------------------------------------------------------------------

    /// Run rounds until [`RoundEngine::shutdown`] is called or `external`
    /// fires. Stops at the next timer.
    pub async fn run(&self, mut external: Shutdown) {
        let mut stop = self.stop.subscribe();
        info!(
            betting = ?self.timing.betting,
            drawing = ?self.timing.drawing,
            settling = ?self.timing.settling,
            "round driver started"
        );

        loop {
            if !self.play_round(&mut stop, &mut external).await {
                break;
            }
        }

        info!("round driver stopped");
    }

    /// One full round. `false` once a stop signal interrupts it.
    async fn play_round(&self, stop: &mut Shutdown, external: &mut Shutdown) -> bool {
        self.open_round().await;

        let mut remaining = self.timing.betting_secs();
        while remaining > 0 {
            if !pause(Duration::from_secs(1), stop, external).await {
                return false;
            }
            remaining -= 1;
            self.tick(remaining);
        }

        self.close_betting().await;
        let outcome = match self.draw().await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.abandon_round(&err).await;
                return true;
            }
        };
        if !pause(self.timing.drawing, stop, external).await {
            return false;
        }

        self.settle(outcome).await;
        if !pause(self.timing.settling, stop, external).await {
            return false;
        }

        self.refill_depleted();
        true
    }

    /// Ask the driver to stop at its next timer.
    pub fn shutdown(&self) {
        self.stop.send_replace(true);
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    fn publish(&self, event: &OutboundEvent) {
        if let Some(payload) = encode(event) {
            self.outbound.broadcast(payload);
        }
    }

    fn notify(&self, participant: &ParticipantId, event: &OutboundEvent) {
        if let Some(payload) = encode(event) {
            self.outbound.send_to(participant, payload);
        }
    }
}

/// Sleep for `duration`. `false` if either stop signal fired first.
async fn pause(duration: Duration, stop: &mut Shutdown, external: &mut Shutdown) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = wait_for_shutdown(stop) => false,
        _ = wait_for_shutdown(external) => false,
    }
}
