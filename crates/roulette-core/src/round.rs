//! The live round and the outcome history.
//!
//! A [`Round`] moves `Betting -> Drawing -> Settling` and is then
//! replaced wholesale by a fresh one. Phase changes take `&mut self`;
//! appending a wager takes `&self`. Callers that share a round behind a
//! reader/writer lock therefore append under the *shared* guard and flip
//! the phase under the *exclusive* guard, which is exactly the barrier
//! the betting cutoff needs: the flip waits for every in-flight append.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::wager::Wager;
use crate::wheel::Outcome;

/// Number of past outcomes kept in the history.
pub const HISTORY_LEN: usize = 10;

/// Phase of the live round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Betting,
    Drawing,
    Settling,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Betting => "BETTING",
            Phase::Drawing => "DRAWING",
            Phase::Settling => "SETTLING",
        }
    }
}

/// One betting round.
#[derive(Debug)]
pub struct Round {
    phase: Phase,

    /// Submission order. Guarded separately so appends can run under a
    /// shared borrow of the round.
    wagers: Mutex<Vec<Wager>>,

    outcome: Option<Outcome>,
}

impl Default for Round {
    fn default() -> Self {
        Round::new()
    }
}

impl Round {
    /// Fresh round, open for betting.
    pub fn new() -> Self {
        Round {
            phase: Phase::Betting,
            wagers: Mutex::new(Vec::new()),
            outcome: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_open(&self) -> bool {
        self.phase == Phase::Betting
    }

    /// Append a wager. The caller must have checked [`Round::is_open`]
    /// under the same shared borrow.
    pub fn append(&self, wager: Wager) {
        debug_assert!(self.is_open(), "wager appended outside betting");
        self.wagers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(wager);
    }

    /// Snapshot of the wagers in submission order.
    pub fn wagers(&self) -> Vec<Wager> {
        self.wagers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn wager_count(&self) -> usize {
        self.wagers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Stop accepting wagers.
    pub fn close(&mut self) {
        self.phase = Phase::Drawing;
    }

    /// Record the drawn outcome. Only meaningful while drawing.
    pub fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
    }

    /// Enter settling and hand back the wagers to pay out.
    pub fn settle(&mut self) -> Vec<Wager> {
        self.phase = Phase::Settling;
        self.wagers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Abandon the round: drop every wager and return them for refund.
    pub fn abandon(&mut self) -> Vec<Wager> {
        self.phase = Phase::Settling;
        self.outcome = None;
        std::mem::take(self.wagers.get_mut().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Snapshot of where the live round is, for syncing late joiners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundStatus {
    pub phase: Phase,

    /// Present only while settling.
    pub outcome: Option<Outcome>,

    /// Seconds left, present only while betting.
    pub countdown: Option<u32>,
}

impl RoundStatus {
    pub fn betting(seconds_remaining: u32) -> Self {
        RoundStatus {
            phase: Phase::Betting,
            outcome: None,
            countdown: Some(seconds_remaining),
        }
    }

    pub fn drawing() -> Self {
        RoundStatus {
            phase: Phase::Drawing,
            outcome: None,
            countdown: None,
        }
    }

    pub fn settling(outcome: Outcome) -> Self {
        RoundStatus {
            phase: Phase::Settling,
            outcome: Some(outcome),
            countdown: None,
        }
    }
}

/// Last [`HISTORY_LEN`] outcomes, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    outcomes: VecDeque<Outcome>,
}

impl History {
    pub fn new() -> Self {
        History::default()
    }

    pub fn record(&mut self, outcome: Outcome) {
        self.outcomes.push_front(outcome);
        self.outcomes.truncate(HISTORY_LEN);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Plain numbers, most recent first.
    pub fn numbers(&self) -> Vec<u8> {
        self.outcomes.iter().map(|o| o.number()).collect()
    }
}
