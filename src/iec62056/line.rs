//! # Line Framer
//!
//! Accumulates inbound bytes into LF-terminated line units. Each line is kept
//! in two textual projections: uppercase space-separated hex, and printable
//! ASCII with `.` for anything outside 0x20..=0x7E. The interpreter matches
//! handshake requests against these projections, not against raw bytes.
//!
//! A line that grows past [`RAW_BUFFER_HIGH_WATER`] bytes without an LF is
//! cut down to its last [`RAW_BUFFER_RETAIN`] bytes, so a request at the end
//! of a long noisy line is still recognised.

use crate::constants::{LF, RAW_BUFFER_HIGH_WATER, RAW_BUFFER_RETAIN};
use crate::util::hex::{hex_pair, printable_byte};

/// A completed line, including its LF terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// e.g. `"2F 3F 21 0D 0A"`
    pub hex: String,
    /// e.g. `"/?!.."`
    pub ascii: String,
}

/// Characters each byte occupies in the hex projection ("XX ").
const HEX_WIDTH: usize = 3;

/// In-progress line accumulators.
#[derive(Debug, Default, Clone)]
pub struct LineFramer {
    line_hex: String,
    line_ascii: String,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorbs one byte and returns the completed line when it is an LF.
    pub fn push(&mut self, byte: u8) -> Option<Line> {
        self.line_hex.push_str(&hex_pair(byte));
        self.line_hex.push(' ');
        self.line_ascii.push(printable_byte(byte) as char);

        if byte != LF {
            self.trim();
            return None;
        }

        let line = Line {
            hex: self.line_hex.trim().to_string(),
            ascii: self.line_ascii.trim().to_string(),
        };
        self.reset();
        Some(line)
    }

    /// Lazily yields every line completed by `bytes`.
    ///
    /// Bytes after the last LF stay in the accumulators for the next call.
    pub fn feed<'a>(&'a mut self, bytes: &'a [u8]) -> Lines<'a> {
        Lines {
            framer: self,
            bytes: bytes.iter(),
        }
    }

    fn trim(&mut self) {
        let len = self.line_ascii.len();
        if len > RAW_BUFFER_HIGH_WATER {
            let dropped = len - RAW_BUFFER_RETAIN;
            self.line_ascii.drain(..dropped);
            self.line_hex.drain(..dropped * HEX_WIDTH);
        }
    }

    /// Drops whatever partial line has been collected.
    pub fn reset(&mut self) {
        self.line_hex.clear();
        self.line_ascii.clear();
    }

    /// Hex projection of the partial line, untrimmed.
    pub fn pending_hex(&self) -> &str {
        &self.line_hex
    }

    /// ASCII projection of the partial line.
    pub fn pending_ascii(&self) -> &str {
        &self.line_ascii
    }

    /// Bytes in the partial line.
    pub fn pending_len(&self) -> usize {
        self.line_ascii.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line_ascii.is_empty()
    }
}

/// Iterator returned by [`LineFramer::feed`].
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
    bytes: std::slice::Iter<'a, u8>,
}

impl Iterator for Lines<'_> {
    type Item = Line;

    fn next(&mut self) -> Option<Line> {
        for &byte in self.bytes.by_ref() {
            if let Some(line) = self.framer.push(byte) {
                return Some(line);
            }
        }
        None
    }
}
