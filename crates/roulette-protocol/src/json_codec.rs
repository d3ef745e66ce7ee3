//! JSON encoding/decoding of wire messages.
//!
//! Each message is one JSON object. Encoders return the object bytes
//! only; line framing is added by the transport (see [`crate::framing`]).
//!
//! Decoding inbound actions distinguishes three cases:
//! - a known action            -> `Ok(Some(action))`
//! - a well-formed object with an unknown `action` -> `Ok(None)` (ignored)
//! - anything else             -> `Err(ProtocolError)` (malformed)

use std::fmt;

use bytes::Bytes;
use serde_json::Value;

use crate::messages::{InboundAction, OutboundEvent, KNOWN_ACTIONS};

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug)]
pub enum ProtocolError {
    /// Not valid JSON, or JSON that does not fit the message shape.
    Json(serde_json::Error),

    /// Valid JSON object without a string `action` field.
    MissingAction,

    /// Frame exceeded the configured maximum size.
    FrameTooLarge { limit: usize },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Json(err) => write!(f, "invalid message: {err}"),
            ProtocolError::MissingAction => f.write_str("message has no action"),
            ProtocolError::FrameTooLarge { limit } => {
                write!(f, "frame exceeds maximum payload size of {limit} bytes")
            }
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Json(err)
    }
}

/// Encode an outbound event.
pub fn encode_event(event: &OutboundEvent) -> Result<Bytes, ProtocolError> {
    Ok(Bytes::from(serde_json::to_vec(event)?))
}

/// Decode an outbound event (client side).
pub fn decode_event(frame: &[u8]) -> Result<OutboundEvent, ProtocolError> {
    Ok(serde_json::from_slice(frame)?)
}

/// Encode an inbound action (client side).
pub fn encode_action(action: &InboundAction) -> Result<Bytes, ProtocolError> {
    Ok(Bytes::from(serde_json::to_vec(action)?))
}

/// Decode an inbound action. Unknown actions yield `Ok(None)`.
pub fn decode_action(frame: &[u8]) -> Result<Option<InboundAction>, ProtocolError> {
    let value: Value = serde_json::from_slice(frame)?;
    let action = value
        .get("action")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingAction)?;

    if !KNOWN_ACTIONS.contains(&action) {
        return Ok(None);
    }

    Ok(Some(serde_json::from_value(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use roulette_core::{Category, ParticipantId, Phase};

    #[test]
    fn decodes_place_bet() {
        let frame = br#"{"action":"place_bet","category":"color","selector":"red","stake":100}"#;
        assert_eq!(
            decode_action(frame).unwrap(),
            Some(InboundAction::PlaceBet {
                category: "color".into(),
                selector: "red".into(),
                stake: 100,
            })
        );
    }

    #[test]
    fn accepts_legacy_field_names_and_numeric_selector() {
        let frame = br#"{"action":"place_bet","bet_type":"straight","bet_value":17,"amount":5}"#;
        assert_eq!(
            decode_action(frame).unwrap(),
            Some(InboundAction::PlaceBet {
                category: "straight".into(),
                selector: "17".into(),
                stake: 5,
            })
        );

        let frame = br#"{"action":"reconnect","user_id":"abc","name":"Al"}"#;
        assert_eq!(
            decode_action(frame).unwrap(),
            Some(InboundAction::Reconnect {
                identity: "abc".into(),
                name: "Al".into(),
            })
        );
    }

    #[test]
    fn negative_stake_is_not_malformed() {
        let frame = br#"{"action":"place_bet","category":"color","selector":"red","stake":-5}"#;
        assert!(matches!(
            decode_action(frame),
            Ok(Some(InboundAction::PlaceBet { stake: -5, .. }))
        ));
    }

    #[test]
    fn unknown_actions_are_ignored() {
        assert_eq!(decode_action(br#"{"action":"cash_out"}"#).unwrap(), None);
    }

    #[test]
    fn malformed_payloads_are_errors() {
        assert!(matches!(decode_action(b"not json"), Err(ProtocolError::Json(_))));
        assert!(matches!(decode_action(br#"{"stake":1}"#), Err(ProtocolError::MissingAction)));
        assert!(matches!(
            decode_action(br#"{"action":"place_bet","category":"color"}"#),
            Err(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn events_carry_their_type_tag() {
        let bytes = encode_event(&OutboundEvent::Countdown {
            phase: Phase::Betting,
            seconds_remaining: 3,
        })
        .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "countdown");
        assert_eq!(value["phase"], "BETTING");
        assert_eq!(value["seconds_remaining"], 3);

        let ping: Value = serde_json::from_slice(&encode_event(&OutboundEvent::Ping).unwrap()).unwrap();
        assert_eq!(ping, serde_json::json!({"type": "ping"}));
    }

    #[test]
    fn game_state_omits_absent_fields() {
        let bytes = encode_event(&OutboundEvent::GameState {
            phase: Phase::Drawing,
            outcome: None,
            countdown: None,
            history: vec![3, 0],
        })
        .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value.get("outcome").is_none());
        assert!(value.get("countdown").is_none());
        assert_eq!(value["phase"], "DRAWING");
    }

    #[test]
    fn result_event_decodes_on_the_client() {
        let event = OutboundEvent::RoundResult {
            outcome: 17,
            payouts: vec![crate::PayoutLine {
                category: Category::Straight,
                selector: "17".into(),
                stake: 10,
                winnings: 350,
            }],
            total_returned: 360,
            balance: 10_350,
        };
        let bytes = encode_event(&event).unwrap();
        assert!(std::str::from_utf8(&bytes).unwrap().contains(r#""type":"result""#));
        assert_eq!(decode_event(&bytes).unwrap(), event);

        let left = OutboundEvent::PlayerLeft {
            identity: ParticipantId::from("abcd"),
        };
        assert_eq!(decode_event(&encode_event(&left).unwrap()).unwrap(), left);
    }
}
