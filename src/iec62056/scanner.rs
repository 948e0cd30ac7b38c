//! # OBIS Request Frame Scanner
//!
//! The readout request `SOH R2 STX 1.8.0() ETX` is not LF-terminated, so it
//! cannot be found through the line framer. The scanner follows the raw byte
//! stream with a partial-match cursor and reports the request on the byte that
//! completes it, independent of line boundaries.

use crate::constants::OBIS_REQUEST_FRAME;

/// True when the OBIS request occurs anywhere in `buffer` as a contiguous run.
pub fn contains_obis_frame(buffer: &[u8]) -> bool {
    buffer
        .windows(OBIS_REQUEST_FRAME.len())
        .any(|w| w == OBIS_REQUEST_FRAME)
}

/// Incremental matcher for a fixed byte pattern (Knuth–Morris–Pratt).
#[derive(Debug, Clone)]
pub struct FrameScanner {
    pattern: &'static [u8],
    /// failure[i]: length of the longest proper prefix of pattern[..=i] that is also a suffix
    failure: Vec<usize>,
    /// Number of pattern bytes matched so far
    cursor: usize,
}

impl Default for FrameScanner {
    fn default() -> Self {
        Self::obis_request()
    }
}

impl FrameScanner {
    /// Scanner for the OBIS 1.8.0 read request.
    pub fn obis_request() -> Self {
        Self::new(OBIS_REQUEST_FRAME)
    }

    pub fn new(pattern: &'static [u8]) -> Self {
        assert!(!pattern.is_empty(), "scanner pattern must not be empty");

        let mut failure = vec![0usize; pattern.len()];
        let mut k = 0;
        for i in 1..pattern.len() {
            while k > 0 && pattern[i] != pattern[k] {
                k = failure[k - 1];
            }
            if pattern[i] == pattern[k] {
                k += 1;
            }
            failure[i] = k;
        }

        FrameScanner {
            pattern,
            failure,
            cursor: 0,
        }
    }

    /// Advances the cursor by one byte. Returns `true` when this byte
    /// completes the pattern; the cursor then restarts from the overlap.
    pub fn push(&mut self, byte: u8) -> bool {
        while self.cursor > 0 && self.pattern[self.cursor] != byte {
            self.cursor = self.failure[self.cursor - 1];
        }
        if self.pattern[self.cursor] == byte {
            self.cursor += 1;
        }
        if self.cursor == self.pattern.len() {
            self.cursor = self.failure[self.cursor - 1];
            return true;
        }
        false
    }

    /// Number of pattern bytes currently matched.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}
