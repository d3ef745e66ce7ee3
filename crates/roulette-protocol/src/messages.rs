//! Wire messages.
//!
//! - [`InboundAction`]: participant → server, tagged by `action`.
//! - [`OutboundEvent`]: server → participant(s), tagged by `type`.
//!
//! Field names follow the published protocol; a few legacy spellings
//! (`bet_type`, `bet_value`, `amount`, `user_id`) are still accepted on
//! input.

use roulette_core::{Category, ParticipantId, ParticipantSummary, Payout, Phase};
use serde::{Deserialize, Deserializer, Serialize};

/// Action names the server understands. Anything else is ignored.
pub const KNOWN_ACTIONS: [&str; 3] = ["place_bet", "set_name", "reconnect"];

/// A request from a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InboundAction {
    /// Stake a wager on the live round.
    ///
    /// `category` and `selector` stay raw text here; the round engine
    /// validates them so a bad value earns a `bet_rejected` rather than
    /// being dropped as a malformed payload.
    PlaceBet {
        #[serde(alias = "bet_type")]
        category: String,
        #[serde(alias = "bet_value", deserialize_with = "string_or_number")]
        selector: String,
        #[serde(alias = "amount")]
        stake: i64,
    },

    /// Name (and, on first use, register) this connection's participant.
    SetName {
        #[serde(alias = "display_name")]
        name: String,
    },

    /// Resume a previous identity if the server still knows it.
    Reconnect {
        #[serde(alias = "user_id", alias = "previous_identity")]
        identity: String,
        #[serde(default, alias = "display_name")]
        name: String,
    },
}

/// Straight-up selectors may arrive as JSON numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(n) => n.to_string(),
    })
}

/// One line of a personal result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutLine {
    pub category: Category,
    pub selector: String,
    pub stake: u64,
    /// Profit only; zero for a losing wager.
    pub winnings: u64,
}

impl From<&Payout> for PayoutLine {
    fn from(payout: &Payout) -> Self {
        PayoutLine {
            category: payout.wager.selection.category(),
            selector: payout.wager.selection.selector(),
            stake: payout.wager.stake,
            winnings: payout.winnings,
        }
    }
}

/// An event sent to one participant or broadcast to everyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Sent once per join or resume. `identity` is authoritative; clients
    /// persist it for later `reconnect` attempts.
    Welcome {
        identity: ParticipantId,
        balance: u64,
        history: Vec<u8>,
        players: Vec<ParticipantSummary>,
    },

    /// Phase change, or a sync snapshot for a joining participant.
    GameState {
        phase: Phase,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        outcome: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        countdown: Option<u32>,
        history: Vec<u8>,
    },

    /// Per-second tick during betting.
    Countdown { phase: Phase, seconds_remaining: u32 },

    BetAccepted {
        category: Category,
        selector: String,
        stake: u64,
        balance: u64,
    },

    BetRejected { reason: String },

    /// Public notice of someone's accepted wager.
    BetPlaced {
        identity: ParticipantId,
        name: String,
        category: Category,
        selector: String,
        stake: u64,
    },

    /// Personal settlement, sent to every known participant each round.
    #[serde(rename = "result")]
    RoundResult {
        outcome: u8,
        payouts: Vec<PayoutLine>,
        total_returned: u64,
        balance: u64,
    },

    PlayerList { players: Vec<ParticipantSummary> },

    PlayerJoined { player: ParticipantSummary },

    PlayerLeft { identity: ParticipantId },

    PlayerBalanceUpdated { identity: ParticipantId, balance: u64 },

    /// Keep-alive written on idle connections. Carries nothing.
    Ping,
}

impl OutboundEvent {
    /// Wire tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundEvent::Welcome { .. } => "welcome",
            OutboundEvent::GameState { .. } => "game_state",
            OutboundEvent::Countdown { .. } => "countdown",
            OutboundEvent::BetAccepted { .. } => "bet_accepted",
            OutboundEvent::BetRejected { .. } => "bet_rejected",
            OutboundEvent::BetPlaced { .. } => "bet_placed",
            OutboundEvent::RoundResult { .. } => "result",
            OutboundEvent::PlayerList { .. } => "player_list",
            OutboundEvent::PlayerJoined { .. } => "player_joined",
            OutboundEvent::PlayerLeft { .. } => "player_left",
            OutboundEvent::PlayerBalanceUpdated { .. } => "player_balance_updated",
            OutboundEvent::Ping => "ping",
        }
    }
}
