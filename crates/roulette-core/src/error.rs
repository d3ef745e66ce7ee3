//! Error types for the round logic.
//!
//! [`WagerError`] covers everything a participant can get back from a
//! wager submission: validation failures (bad category, selector, stake)
//! and state failures (phase closed, unknown participant, insufficient
//! balance). None of these are faults; they are reported to the
//! submitter as-is.

use thiserror::Error;

use crate::wager::Category;

/// Why a wager was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WagerError {
    /// Stake was zero or negative.
    #[error("bet amount must be greater than 0")]
    NonPositiveStake,

    /// Category name not recognised.
    #[error("unknown bet type: {0}")]
    InvalidCategory(String),

    /// Selector not legal for the category.
    #[error("invalid bet value: {category} bet {selector} (must be {expected})")]
    InvalidSelector {
        category: Category,
        selector: String,
        expected: &'static str,
    },

    /// The round is no longer in the betting phase.
    #[error("betting is closed")]
    PhaseClosed,

    /// The submitting identity is not (or no longer) registered.
    #[error("user not found")]
    UnknownParticipant,

    /// Stake exceeds the participant's current balance.
    #[error("insufficient balance")]
    InsufficientBalance,
}

impl WagerError {
    /// True for errors caused by the shape of the request itself, as
    /// opposed to the state of the round or the participant.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WagerError::NonPositiveStake
                | WagerError::InvalidCategory(_)
                | WagerError::InvalidSelector { .. }
        )
    }
}

/// Failure of the outcome source.
#[derive(Debug, Error)]
pub enum DrawError {
    #[error("failed to generate random number: {0}")]
    Entropy(#[from] rand::Error),

    #[error("outcome source exhausted")]
    Exhausted,
}
