//! roulette-protocol
//!
//! Wire-level encoding/decoding for the roulette server.
//!
//! This crate is responsible for turning logical messages into bytes and
//! back again:
//!
//! - [`messages`]   : `InboundAction` / `OutboundEvent` definitions
//! - [`json_codec`] : JSON encode/decode of single messages
//! - [`framing`]    : newline-delimited framing for TCP streams

pub mod framing;
pub mod json_codec;
pub mod messages;

pub use framing::{frame, LineFramer};
pub use json_codec::{decode_action, decode_event, encode_action, encode_event, ProtocolError};
pub use messages::{InboundAction, OutboundEvent, PayoutLine};
