//! roulette-core
//!
//! Pure roulette round logic:
//! - participants and their identity tokens
//! - wager categories, selectors and validation
//! - the wheel (outcomes, colors, outcome sources)
//! - payout rules
//! - the live round and the outcome history
//! - display-name sanitization

pub mod error;
pub mod name;
pub mod participant;
pub mod payout;
pub mod round;
pub mod wager;
pub mod wheel;

pub use error::{DrawError, WagerError};
pub use name::{display_name, sanitize_name, MAX_NAME_LEN};
pub use participant::{Participant, ParticipantId, ParticipantSummary};
pub use payout::{settle, winnings, Payout};
pub use round::{History, Phase, Round, RoundStatus, HISTORY_LEN};
pub use wager::{validate, Category, DozenRange, Parity, Selection, Wager};
pub use wheel::{Color, OsWheel, Outcome, OutcomeSource, POCKETS};
#[cfg(any(test, feature = "test-util"))]
pub use wheel::ScriptedWheel;
