//! Participant identity and per-participant state.
//!
//! A participant exists independently of any live connection: it is
//! created on first contact, survives disconnects for a grace period,
//! and is only removed by the background sweep.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

/// Opaque identity token.
///
/// Server-generated tokens are 32 lowercase hex characters. Tokens
/// presented by clients on reconnect are taken verbatim; they only
/// resolve if the registry still knows them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Fresh random identity.
    pub fn generate() -> Self {
        ParticipantId(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First four characters, used to disambiguate display names.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(4) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ParticipantId {
    fn from(value: String) -> Self {
        ParticipantId(value)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        ParticipantId(value.to_string())
    }
}

/// A known participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,

    /// Sanitized display name, already carrying the `#xxxx` suffix.
    pub name: String,

    /// Balance in minor currency units.
    pub balance: u64,

    /// Set while disconnected; `None` while a connection is live.
    pub last_disconnect: Option<Instant>,
}

impl Participant {
    /// New participant with the given starting balance and a placeholder
    /// name until one is assigned.
    pub fn new(id: ParticipantId, starting_balance: u64) -> Self {
        let name = format!("Player#{}", id.short());
        Participant {
            id,
            name,
            balance: starting_balance,
            last_disconnect: None,
        }
    }

    /// Whether the participant has been disconnected for at least `grace`
    /// as of `now`.
    pub fn is_expired(&self, now: Instant, grace: std::time::Duration) -> bool {
        match self.last_disconnect {
            Some(at) => now.saturating_duration_since(at) >= grace,
            None => false,
        }
    }

    pub fn summary(&self, connected: bool) -> ParticipantSummary {
        ParticipantSummary {
            identity: self.id.clone(),
            name: self.name.clone(),
            balance: self.balance,
            connected,
        }
    }
}

/// Public view of a participant, as shown in player lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub identity: ParticipantId,
    pub name: String,
    pub balance: u64,
    pub connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn generated_ids_are_hex_and_unique() {
        let a = ParticipantId::generate();
        let b = ParticipantId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn short_handles_tiny_tokens() {
        assert_eq!(ParticipantId::from("abcdef").short(), "abcd");
        assert_eq!(ParticipantId::from("ab").short(), "ab");
    }

    #[test]
    fn new_participant_gets_placeholder_name() {
        let p = Participant::new(ParticipantId::from("beefcafe"), 10_000);
        assert_eq!(p.name, "Player#beef");
        assert_eq!(p.balance, 10_000);
        assert!(p.last_disconnect.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_follows_grace_period() {
        let mut p = Participant::new(ParticipantId::from("beefcafe"), 100);
        let grace = Duration::from_secs(120);
        assert!(!p.is_expired(Instant::now(), grace));

        p.last_disconnect = Some(Instant::now());
        tokio::time::advance(Duration::from_secs(119)).await;
        assert!(!p.is_expired(Instant::now(), grace));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(p.is_expired(Instant::now(), grace));
    }
}
