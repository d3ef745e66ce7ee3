//! Newline-delimited framing.
//!
//! Every message on the TCP stream is one JSON object followed by `\n`.
//! JSON encoders never emit raw newlines inside an object, so the
//! delimiter is unambiguous.
//!
//! [`LineFramer`] accumulates raw reads and yields complete frames,
//! enforcing a maximum payload size so a peer cannot make the server
//! buffer without bound.

use bytes::{Bytes, BytesMut};

use crate::json_codec::ProtocolError;

pub const DELIMITER: u8 = b'\n';

/// Incremental line splitter.
#[derive(Debug)]
pub struct LineFramer {
    buffer: BytesMut,
    max_payload: usize,
}

impl LineFramer {
    pub fn new(max_payload: usize) -> Self {
        LineFramer {
            buffer: BytesMut::with_capacity(max_payload.min(64 * 1024)),
            max_payload,
        }
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Next complete frame, without the delimiter and surrounding
    /// whitespace. Blank lines are skipped.
    ///
    /// Returns `Err(FrameTooLarge)` when a frame (or a partial frame still
    /// waiting for its delimiter) exceeds the limit; the stream should be
    /// dropped at that point.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        loop {
            let Some(pos) = self.buffer.iter().position(|&b| b == DELIMITER) else {
                if self.buffer.len() > self.max_payload {
                    return Err(ProtocolError::FrameTooLarge { limit: self.max_payload });
                }
                return Ok(None);
            };

            if pos > self.max_payload {
                return Err(ProtocolError::FrameTooLarge { limit: self.max_payload });
            }

            let mut line = self.buffer.split_to(pos + 1);
            line.truncate(pos);
            let line = line.freeze();
            let trimmed = trim_ascii(&line);
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(line.slice_ref(trimmed)));
        }
    }

    /// Bytes buffered but not yet framed.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Append the delimiter to an encoded payload.
pub fn frame(payload: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(payload.len() + 1);
    out.extend_from_slice(payload);
    out.extend_from_slice(&[DELIMITER]);
    out.freeze()
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_across_reads() {
        let mut framer = LineFramer::new(1024);
        framer.extend(b"{\"a\":1}\n{\"b\"");
        assert_eq!(framer.next_frame().unwrap().as_deref(), Some(&b"{\"a\":1}"[..]));
        assert_eq!(framer.next_frame().unwrap(), None);
        framer.extend(b":2}\r\n");
        assert_eq!(framer.next_frame().unwrap().as_deref(), Some(&b"{\"b\":2}"[..]));
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn skips_blank_lines() {
        let mut framer = LineFramer::new(1024);
        framer.extend(b"\n  \n{}\n");
        assert_eq!(framer.next_frame().unwrap().as_deref(), Some(&b"{}"[..]));
        assert_eq!(framer.next_frame().unwrap(), None);
    }

    #[test]
    fn rejects_oversize_frames() {
        let mut framer = LineFramer::new(8);
        framer.extend(b"0123456789\n");
        assert!(matches!(framer.next_frame(), Err(ProtocolError::FrameTooLarge { limit: 8 })));

        let mut framer = LineFramer::new(8);
        framer.extend(b"0123456789");
        assert!(framer.next_frame().is_err());
    }

    #[test]
    fn exact_limit_is_allowed() {
        let mut framer = LineFramer::new(4);
        framer.extend(b"abcd\n");
        assert_eq!(framer.next_frame().unwrap().as_deref(), Some(&b"abcd"[..]));
    }

    #[test]
    fn frame_appends_delimiter() {
        assert_eq!(&frame(b"{}")[..], b"{}\n");
    }
}
